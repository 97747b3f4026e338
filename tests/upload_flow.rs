use assert_matches::assert_matches;
use image::codecs::gif::GifEncoder;
use image::{Delay, Frame, ImageEncoder, Rgba, RgbaImage};
use pretty_assertions::assert_eq;

use emx::{
    Endpoint, Error, FakeConnector, FrameGeometry, ItemId, MatrixClient, MediaError,
    TransferError, TransferTuning,
};

fn solid_png(rgba: [u8; 4]) -> Vec<u8> {
    let mut png_bytes = Vec::new();
    let source = RgbaImage::from_pixel(3, 3, Rgba(rgba));
    image::codecs::png::PngEncoder::new(&mut png_bytes)
        .write_image(source.as_raw(), 3, 3, image::ExtendedColorType::Rgba8)
        .expect("in-memory png encoding should succeed");
    png_bytes
}

fn gif_with_frames(frame_count: usize, side: u32) -> Vec<u8> {
    let mut gif_bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut gif_bytes);
        for index in 0..frame_count {
            let shade = u8::try_from(index % 256).expect("index fits u8");
            let buffer = RgbaImage::from_pixel(side, side, Rgba([shade, shade, shade, 0xFF]));
            encoder
                .encode_frame(Frame::from_parts(
                    buffer,
                    0,
                    0,
                    Delay::from_numer_denom_ms(100, 1),
                ))
                .expect("in-memory gif encoding should succeed");
        }
    }
    gif_bytes
}

fn client_with(connector: &FakeConnector, geometry: FrameGeometry) -> MatrixClient {
    let tuning = TransferTuning::builder().geometry(geometry).build();
    MatrixClient::new(Box::new(connector.clone()), Endpoint::new("fake-device", 1))
        .with_tuning(tuning)
}

fn small_geometry() -> FrameGeometry {
    FrameGeometry::new(4, 4).expect("4x4 should be valid")
}

#[tokio::test]
async fn still_upload_writes_header_then_packed_payload() {
    let connector = FakeConnector::acking();
    let client = client_with(&connector, small_geometry());

    let receipt = client
        .upload_bytes(ItemId::new(5), &solid_png([0xFF, 0x00, 0x00, 0xFF]), false)
        .await
        .expect("still upload against acking device should succeed");

    assert_eq!(1, receipt.frame_count());
    assert!(!receipt.animated());

    let wire = connector.write_log().bytes();
    // 'U', id=5 LE, kind=still, frame_count=1 LE, then 16 packed pixels.
    assert_eq!([b'U', 0x05, 0x00, 0x00, 0x01, 0x00].as_slice(), &wire[..6]);
    assert_eq!(6 + 32, wire.len());
    // Solid red packs to 0xF800, little-endian on the wire.
    assert!(wire[6..].chunks(2).all(|pair| pair == [0x00, 0xF8]));
}

#[tokio::test]
async fn animated_upload_counts_frames_in_header() {
    let connector = FakeConnector::acking();
    let geometry = FrameGeometry::new(2, 2).expect("2x2 should be valid");
    let client = client_with(&connector, geometry);

    let receipt = client
        .upload_bytes(ItemId::new(1), &gif_with_frames(3, 2), true)
        .await
        .expect("animated upload against acking device should succeed");

    assert_eq!(3, receipt.frame_count());
    assert!(receipt.animated());

    let wire = connector.write_log().bytes();
    assert_eq!([b'U', 0x01, 0x00, 0x01, 0x03, 0x00].as_slice(), &wire[..6]);
    // Three 2x2 frames, two bytes per pixel.
    assert_eq!(6 + 3 * 8, wire.len());
}

#[tokio::test]
async fn ten_frame_gif_at_stock_geometry_takes_three_acks() {
    let connector = FakeConnector::acking();
    let client = client_with(&connector, FrameGeometry::default());

    let receipt = client
        .upload_bytes(ItemId::new(2), &gif_with_frames(10, 64), true)
        .await
        .expect("ten-frame upload should succeed");

    // 10 x 8192 = 81920 payload bytes -> acks at 32768, 65536, and 81920.
    assert_eq!(81_920, receipt.transfer().payload_len());
    assert_eq!(3, receipt.transfer().acks_received());
    assert_eq!(320, receipt.transfer().chunks_sent());
}

#[tokio::test]
async fn claimed_animated_non_gif_fails_before_connecting() {
    let connector = FakeConnector::acking();
    let client = client_with(&connector, small_geometry());

    let result = client
        .upload_bytes(ItemId::new(1), &solid_png([0x00, 0x00, 0xFF, 0xFF]), true)
        .await;

    assert_matches!(result, Err(Error::Media(MediaError::NotAnimated { .. })));
    assert_eq!(0, connector.connect_count());
}

#[tokio::test]
async fn upload_by_path_claims_animated_from_extension() {
    let dir = std::env::temp_dir().join(format!("emx-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");

    // PNG bytes behind a .gif name: the claim fails the signature check.
    let lying_path = dir.join("sprite.gif");
    std::fs::write(&lying_path, solid_png([0x10, 0x20, 0x30, 0xFF]))
        .expect("temp file should be writable");

    let connector = FakeConnector::acking();
    let client = client_with(&connector, small_geometry());
    let result = client.upload(ItemId::new(1), &lying_path).await;
    assert_matches!(result, Err(Error::Media(MediaError::NotAnimated { .. })));

    // The same bytes behind a .png name upload as a single still frame.
    let honest_path = dir.join("sprite.png");
    std::fs::write(&honest_path, solid_png([0x10, 0x20, 0x30, 0xFF]))
        .expect("temp file should be writable");

    let receipt = client
        .upload(ItemId::new(1), &honest_path)
        .await
        .expect("still upload should succeed");
    assert_eq!(1, receipt.frame_count());
    assert!(!receipt.animated());

    std::fs::remove_dir_all(&dir).expect("temp dir should be removable");
}

#[tokio::test]
async fn text_payload_travels_after_length_prefixed_header() {
    let connector = FakeConnector::acking();
    let client = client_with(&connector, small_geometry());

    let receipt = client
        .send_text(ItemId::new(2), "HI")
        .await
        .expect("text against acking device should succeed");

    assert_eq!(1, receipt.acks_received());
    assert_eq!(
        vec![b'T', 0x02, 0x00, 0x02, 0x00, b'H', b'I'],
        connector.write_log().bytes()
    );
}

#[tokio::test]
async fn delete_writes_three_header_bytes_and_no_payload() {
    let connector = FakeConnector::with_ack_bytes(Vec::new());
    let client = client_with(&connector, small_geometry());

    let receipt = client
        .delete_item(ItemId::new(7))
        .await
        .expect("delete should complete without acknowledgments");

    assert_eq!(0, receipt.acks_received());
    assert_eq!(vec![b'D', 0x07, 0x00], connector.write_log().bytes());
}

#[tokio::test]
async fn run_writes_three_header_bytes_and_no_payload() {
    let connector = FakeConnector::with_ack_bytes(Vec::new());
    let client = client_with(&connector, small_geometry());

    client
        .run_item(ItemId::new(300))
        .await
        .expect("run should complete without acknowledgments");

    assert_eq!(vec![b'R', 0x2C, 0x01], connector.write_log().bytes());
}

#[tokio::test]
async fn unreachable_endpoint_surfaces_connect_error() {
    let connector = FakeConnector::refusing();
    let client = client_with(&connector, small_geometry());

    let result = client.run_item(ItemId::new(1)).await;

    assert_matches!(result, Err(Error::Transfer(TransferError::Connect { .. })));
}

#[tokio::test]
async fn wrong_ack_byte_surfaces_ack_error() {
    let connector = FakeConnector::with_ack_bytes(vec![b'X']);
    let client = client_with(&connector, small_geometry());

    let result = client.send_text(ItemId::new(1), "hello").await;

    assert_matches!(
        result,
        Err(Error::Transfer(TransferError::BadAck { actual: b'X', .. }))
    );
}
