use anyhow::Result;
use opencv::{
    core::{CV_8UC3, Mat, Point, Rect, Scalar},
    imgproc::{self, LINE_8},
    prelude::*,
};
use receipt_verifier::{
    error::{ErrorKind, VerifyError},
    vision::{
        MarkMatcher, Region, ScaleSearch, crop_white_box, decode_image, detect_receipt_border,
        detect_white_box, encode_png, limit_longest_side,
    },
};

fn gray(value: f64) -> Scalar {
    Scalar::new(value, value, value, 0.0)
}

fn canvas(width: i32, height: i32, color: Scalar) -> Result<Mat> {
    Ok(Mat::new_rows_cols_with_default(height, width, CV_8UC3, color)?)
}

/// White square with a dark disc and a dark corner block, drawn at `origin`.
fn draw_mark(img: &mut Mat, origin: Point) -> Result<()> {
    imgproc::rectangle(img, Rect::new(origin.x, origin.y, 50, 50), gray(255.0), -1, LINE_8, 0)?;
    imgproc::circle(
        img,
        Point::new(origin.x + 25, origin.y + 25),
        15,
        gray(30.0),
        -1,
        LINE_8,
        0,
    )?;
    imgproc::rectangle(
        img,
        Rect::new(origin.x + 5, origin.y + 5, 10, 10),
        gray(30.0),
        -1,
        LINE_8,
        0,
    )?;
    Ok(())
}

fn mark_image() -> Result<Mat> {
    let mut mark = canvas(50, 50, gray(255.0))?;
    draw_mark(&mut mark, Point::new(0, 0))?;
    Ok(mark)
}

#[test]
fn test_mark_found_at_known_offset() -> Result<()> {
    let mark = mark_image()?;
    let mut target = canvas(300, 200, gray(200.0))?;
    draw_mark(&mut target, Point::new(120, 70))?;

    let location = MarkMatcher::default().locate(&target, &mark, 0.60)?;
    let found = location
        .found()
        .ok_or_else(|| anyhow::anyhow!("mark not found, best {}", location.best_score()))?;

    assert_eq!(found.region, Region::new(120, 70, 50, 50).unwrap());
    assert!(found.score >= 0.99, "score {}", found.score);
    Ok(())
}

#[test]
fn test_mark_not_found_on_uniform_image() -> Result<()> {
    let mark = mark_image()?;
    let target = canvas(300, 200, gray(200.0))?;

    let location = MarkMatcher::default().locate(&target, &mark, 0.60)?;
    assert!(location.found().is_none());
    assert_eq!(location.best_score(), 0.0);
    Ok(())
}

#[test]
fn test_mark_larger_than_target_is_skipped() -> Result<()> {
    let mark = mark_image()?;
    let target = canvas(12, 12, gray(200.0))?;
    let search = ScaleSearch {
        min_scale: 1.0,
        max_scale: 2.0,
        steps: 5,
        ..Default::default()
    };

    let location = MarkMatcher::new(search).locate(&target, &mark, 0.60)?;
    assert!(location.found().is_none());
    assert_eq!(location.best_score(), 0.0);
    Ok(())
}

#[test]
fn test_uniform_images_have_no_regions() -> Result<()> {
    let black = canvas(200, 200, gray(0.0))?;
    assert_eq!(detect_white_box(&black)?, None);

    let mid = canvas(200, 200, gray(128.0))?;
    assert_eq!(detect_white_box(&mid)?, None);

    let white = canvas(200, 200, gray(255.0))?;
    assert_eq!(detect_receipt_border(&white)?, None);
    Ok(())
}

#[test]
fn test_white_box_on_dark_background() -> Result<()> {
    let mut img = canvas(400, 300, gray(100.0))?;
    imgproc::rectangle(&mut img, Rect::new(50, 60, 200, 150), gray(255.0), -1, LINE_8, 0)?;
    // bright speck below the area minimum
    imgproc::rectangle(&mut img, Rect::new(320, 20, 20, 20), gray(255.0), -1, LINE_8, 0)?;

    let region = detect_white_box(&img)?.ok_or_else(|| anyhow::anyhow!("white box not found"))?;
    assert!((region.x - 50).abs() <= 2, "{:?}", region);
    assert!((region.y - 60).abs() <= 2, "{:?}", region);
    assert!((region.width - 200).abs() <= 4, "{:?}", region);
    assert!((region.height - 150).abs() <= 4, "{:?}", region);

    let border =
        detect_receipt_border(&img)?.ok_or_else(|| anyhow::anyhow!("border not found"))?;
    assert_eq!(border, Region::new(0, 0, 400, 300).unwrap());
    Ok(())
}

#[test]
fn test_crop_white_box_requires_minimum_size() -> Result<()> {
    let mut img = canvas(400, 300, gray(100.0))?;
    imgproc::rectangle(&mut img, Rect::new(50, 60, 200, 150), gray(255.0), -1, LINE_8, 0)?;
    let cropped = crop_white_box(&img)?.ok_or_else(|| anyhow::anyhow!("no crop"))?;
    assert_eq!((cropped.cols(), cropped.rows()), (200, 150));

    let mut small = canvas(400, 300, gray(100.0))?;
    imgproc::rectangle(&mut small, Rect::new(50, 60, 200, 80), gray(255.0), -1, LINE_8, 0)?;
    assert!(crop_white_box(&small)?.is_none());
    Ok(())
}

#[test]
fn test_decode_rejects_bad_payloads() -> Result<()> {
    assert!(matches!(decode_image(&[]), Err(VerifyError::EmptyImage)));

    let err = decode_image(b"definitely not an image").unwrap_err();
    assert!(matches!(err, VerifyError::UnsupportedMedia(_)));
    assert_eq!(err.kind(), ErrorKind::Input);

    // PNG signature followed by garbage
    let mut truncated = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    truncated.extend_from_slice(&[0u8; 32]);
    let err = decode_image(&truncated).unwrap_err();
    assert!(matches!(err, VerifyError::UndecodableImage(_)));
    assert_eq!(err.kind(), ErrorKind::Input);
    Ok(())
}

#[test]
fn test_decode_round_trip() -> Result<()> {
    let mut img = canvas(64, 48, gray(100.0))?;
    draw_mark(&mut img, Point::new(5, 0))?;
    let decoded = decode_image(&encode_png(&img)?)?;
    assert_eq!((decoded.cols(), decoded.rows()), (64, 48));
    assert_eq!(decoded.channels(), 3);
    Ok(())
}

#[test]
fn test_longest_side_is_capped() -> Result<()> {
    let wide = canvas(2500, 1000, gray(200.0))?;
    let capped = limit_longest_side(&wide, 2000)?;
    assert_eq!((capped.cols(), capped.rows()), (2000, 800));

    let small = canvas(640, 480, gray(200.0))?;
    let kept = limit_longest_side(&small, 2000)?;
    assert_eq!((kept.cols(), kept.rows()), (640, 480));
    Ok(())
}
