//! Importer tests against synthetic files on disk.

use std::io::Cursor;
use std::path::Path;

use scenery_core::constants::NO_DATA;
use scenery_core::{SceneryError, TokenTable};

use crate::dem_file::{read_dem, write_dem};
use crate::hgt::{read_hgt, write_hgt};
use crate::raw_img::read_raw_img;
use crate::{import_dem, import_dem_as, Dem, DemFormat, DemHeader, ValueTranslator};

fn write(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn test_hgt_tile_from_disk() {
    // 3×3 tile, NW sample first.
    let values: [i16; 9] = [100, 101, 102, 110, -32768, 112, 120, 121, 122];
    let mut bytes = Vec::new();
    for v in values {
        bytes.extend_from_slice(&v.to_be_bytes());
    }
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "N34W119.hgt", &bytes);

    let dem = import_dem(&path).unwrap();
    assert_eq!(
        (dem.header.west, dem.header.south, dem.header.east, dem.header.north),
        (-119.0, 34.0, -118.0, 35.0)
    );
    assert!(dem.header.post);
    assert_eq!(dem.get(0, 0), 100.0, "Index (0,0) is the first sample in the file");
    assert_eq!(dem.get(1, 1), NO_DATA);
    assert_eq!(dem.get(2, 2), 122.0);

    let lat = dem.header.y_to_lat(0.0);
    let lon = dem.header.x_to_lon(0.0);
    assert_eq!((lon, lat), (-119.0, 35.0), "First sample sits on the NW corner");

    let out = dir.path().join("N34W119_copy.hgt");
    write_hgt(&dem, &out).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), bytes);
    assert_eq!(read_hgt(&out).unwrap(), dem);
}

#[test]
fn test_short_oz_needs_explicit_format() {
    let mut bytes = Vec::new();
    for v in [1i16, 2, 3, 4] {
        bytes.extend_from_slice(&v.to_be_bytes());
    }
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "S34E150.hgt", &bytes);

    let as_hgt = import_dem(&path).unwrap();
    assert_eq!(as_hgt.get(0, 0), 1.0);
    let oz = import_dem_as(&path, Some(DemFormat::ShortOz)).unwrap();
    assert_eq!(oz.get(0, 0), 3.0, "Short grid rows start in the south");
    assert_eq!(oz.get(0, 1), 1.0);
}

#[test]
fn test_raw_img_missing_file_and_short_image() {
    let err = read_raw_img(Path::new("/nonexistent/world.img"), 0, 0, 1, 1).unwrap_err();
    assert!(matches!(err, SceneryError::Io { .. }));

    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "world.img", &[0u8; 1024]);
    let err = read_raw_img(&path, 10, 45, 11, 46).unwrap_err();
    assert!(matches!(err, SceneryError::Format { .. }));
}

#[test]
fn test_hgt_bad_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "tile.hgt", &[0u8; 8]);
    assert!(matches!(import_dem(&path), Err(SceneryError::Format { .. })));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = import_dem(Path::new("/nonexistent/N00E000.hgt")).unwrap_err();
    assert!(matches!(err, SceneryError::Io { .. }));
}

/// Right-aligned fixed-width field.
fn put(buf: &mut [u8], at: usize, width: usize, text: &str) {
    let s = format!("{text:>width$}");
    buf[at..at + width].copy_from_slice(s.as_bytes());
}

/// Fortran `D` notation for a whole number of arc seconds.
fn fortran(v: i64) -> String {
    if v == 0 {
        return "0.0D+00".to_string();
    }
    let digits = v.abs().to_string();
    let sign = if v < 0 { "-" } else { "" };
    format!("{sign}0.{digits}D+{:02}", digits.len())
}

fn usgs_bytes(profiles: &[Vec<i32>]) -> Vec<u8> {
    let mut data = vec![b' '; 1024];
    put(&mut data, 0, 40, "TEST QUAD");
    put(&mut data, 156, 6, "0");
    put(&mut data, 528, 6, "3");
    put(&mut data, 534, 6, "2");
    let corners = [-428400, 122400, -428400, 126000, -424800, 126000, -424800, 122400];
    for (i, c) in corners.iter().enumerate() {
        put(&mut data, 546 + i * 24, 24, &fortran(*c));
    }
    put(&mut data, 852, 6, "1");
    put(&mut data, 858, 6, &profiles.len().to_string());

    for (col, samples) in profiles.iter().enumerate() {
        let mut record = vec![b' '; 1024];
        put(&mut record, 0, 6, "1");
        put(&mut record, 6, 6, &(col + 1).to_string());
        put(&mut record, 12, 6, &samples.len().to_string());
        put(&mut record, 18, 6, "1");
        let mut first = true;
        let mut rest: &[i32] = samples;
        loop {
            let (start, per) = if first { (144, 146) } else { (0, 170) };
            let n = per.min(rest.len());
            for (i, v) in rest[..n].iter().enumerate() {
                put(&mut record, start + i * 6, 6, &v.to_string());
            }
            rest = &rest[n..];
            data.extend_from_slice(&record);
            if rest.is_empty() {
                break;
            }
            record = vec![b' '; 1024];
            first = false;
        }
    }
    data
}

#[test]
fn test_usgs_profiles_run_south_to_north() {
    let data = usgs_bytes(&[vec![100, 110, 120], vec![200, 210, -220]]);
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "quad.dem", &data);
    let dem = import_dem(&path).unwrap();

    assert_eq!((dem.width(), dem.height()), (2, 3));
    assert!((dem.header.west - -119.0).abs() < 1e-9);
    assert!((dem.header.south - 34.0).abs() < 1e-9);
    assert!((dem.header.east - -118.0).abs() < 1e-9);
    assert!((dem.header.north - 35.0).abs() < 1e-9);
    assert_eq!(dem.get(0, 2), 100.0, "First profile sample is the south end");
    assert_eq!(dem.get(0, 0), 120.0);
    assert_eq!(dem.get(1, 0), -220.0);
}

#[test]
fn test_usgs_continuation_records() {
    let samples: Vec<i32> = (0..150).collect();
    let dem = crate::usgs::parse_usgs(&usgs_bytes(&[samples]), "long.dem").unwrap();
    assert_eq!(dem.height(), 150);
    assert_eq!(dem.get(0, 149), 0.0);
    assert_eq!(dem.get(0, 3), 146.0, "First continuation sample");
    assert_eq!(dem.get(0, 0), 149.0);
}

#[test]
fn test_usgs_rejects_feet() {
    let mut data = usgs_bytes(&[vec![1, 2]]);
    put(&mut data, 534, 6, "1");
    assert!(matches!(
        crate::usgs::parse_usgs(&data, "feet.dem"),
        Err(SceneryError::Format { .. })
    ));
}

#[test]
fn test_usgs_truncated_profile() {
    let data = usgs_bytes(&[vec![1, 2], vec![3, 4]]);
    assert!(crate::usgs::parse_usgs(&data[..1024 + 1024 + 100], "cut.dem").is_err());
}

#[test]
fn test_geotiff_gains_shared_edges() {
    use tiff::encoder::{colortype, TiffEncoder};
    use tiff::tags::Tag;

    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buf).unwrap();
        let mut image = encoder.new_image::<colortype::Gray16>(2, 2).unwrap();
        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, &[0.5f64, 0.5, 0.0][..])
            .unwrap();
        image
            .encoder()
            .write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, -119.0, 35.0, 0.0][..])
            .unwrap();
        image.write_data(&[10u16, 20, 30, 0xFFFF]).unwrap();
    }

    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "srtm.tif", buf.get_ref());
    let dem = import_dem(&path).unwrap();

    assert_eq!((dem.width(), dem.height()), (3, 3));
    assert_eq!(
        (dem.header.west, dem.header.south, dem.header.east, dem.header.north),
        (-119.0, 34.0, -118.0, 35.0)
    );
    assert_eq!(dem.samples[0..3], [10.0, 20.0, 20.0], "North row duplicated");
    assert_eq!(dem.samples[3..6], [10.0, 20.0, 20.0]);
    assert_eq!(dem.samples[6..9], [30.0, NO_DATA, NO_DATA], "0xFFFF is a void");
}

#[test]
fn test_persisted_bounds_survive() {
    let dem = Dem::from_samples(
        DemHeader::post(-119.0, 34.0, -118.0, 35.0, 2, 2),
        vec![1.0, 2.0, 3.0, NO_DATA],
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.dem");
    write_dem(&dem, &path).unwrap();

    let back = import_dem(&path).unwrap();
    assert_eq!(back, dem);
    assert_eq!(read_dem(&path).unwrap().header, dem.header);
}

#[test]
fn test_translate_table_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "colors.txt", b"ENUM_COLOR lu_Forest 0,128,0\n");
    let table = write(
        dir.path(),
        "landuse.txt",
        b"INCLUDE colors.txt\nLU_IMPORT 0 lu_Water\nLU_IMPORT 1 lu_Forest\n",
    );
    let mut tokens = TokenTable::new();
    let t = ValueTranslator::load(&table, &mut tokens).unwrap();

    let mut dem = Dem::from_samples(DemHeader::area(0.0, 0.0, 1.0, 1.0, 2, 1), vec![1.0, 0.0]).unwrap();
    t.translate_forward(&mut dem).unwrap();
    assert_eq!(dem.get(0, 0), tokens.lookup("lu_Forest").unwrap() as f32);
    assert_eq!(&t.clut()[3..6], &[0, 128, 0]);
    t.translate_reverse(&mut dem).unwrap();
    assert_eq!(dem.samples, vec![1.0, 0.0]);
}
