//! Round-trip integration tests for marccd-pure.
//!
//! Files are assembled byte by byte in memory so the expected layout is spelled
//! out independently of the encoder.

use marccd_pure::frame::names;
use marccd_pure::{
    BinaryMetadata, ByteOrder, FieldValue, FormatError, Keyword, Layout, MarImage, Overrides,
    PixelGrid, PixelType, HEADER_BYTES, METADATA_SIZE, TEXT_HEADER_SIZE,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn text_block(lines: &[&str]) -> Vec<u8> {
    let mut block = Vec::new();
    for line in lines {
        block.extend_from_slice(line.as_bytes());
        block.push(b'\n');
    }
    block.resize(TEXT_HEADER_SIZE, 0);
    block
}

/// The minimal synthetic file: 2x2 little-endian 16-bit pixels `[1, 2, 3, 4]`
/// behind a zeroed metadata block.
fn minimal_file() -> Vec<u8> {
    let mut file = text_block(&[
        "HEADER_BYTES=4096",
        "DIM=2",
        "BYTE_ORDER=little_endian",
        "TYPE=unsigned_short",
        "SIZE1=2",
        "SIZE2=2",
        "END",
    ]);
    file.extend_from_slice(&[0u8; METADATA_SIZE]);
    for px in [1u16, 2, 3, 4] {
        file.extend_from_slice(&px.to_le_bytes());
    }
    file
}

fn put_u32(file: &mut [u8], offset: usize, value: u32, order: ByteOrder) {
    let bytes = match order {
        ByteOrder::Little => value.to_le_bytes(),
        ByteOrder::Big => value.to_be_bytes(),
    };
    let at = TEXT_HEADER_SIZE + offset;
    file[at..at + 4].copy_from_slice(&bytes);
}

fn invariant_of(err: FormatError) -> &'static str {
    match err {
        FormatError::InconsistentHeader { invariant, .. } => invariant,
        other => panic!("expected InconsistentHeader, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[test]
fn minimal_file_decodes() {
    let image = MarImage::from_bytes(&minimal_file()).unwrap();
    assert_eq!(image.pixels().rows(), vec![vec![1, 2], vec![3, 4]]);
    assert_eq!(image.pixels().pixel_type(), PixelType::UnsignedShort);
    assert_eq!(image.header().len(), 6);
    assert!(image.header().is_terminated());
    assert_eq!(image.metadata(), &BinaryMetadata::default());
    assert_eq!(image.pixel_byte_order(), Ok(ByteOrder::Little));
}

#[test]
fn minimal_file_reencodes_exactly() {
    let file = minimal_file();
    let image = MarImage::from_bytes(&file).unwrap();
    assert_eq!(image.to_bytes().unwrap(), file);
}

#[test]
fn header_without_terminator() {
    let mut full = minimal_file();
    full[..TEXT_HEADER_SIZE].copy_from_slice(&text_block(&[
        "HEADER_BYTES=4096",
        "DIM=2",
        "BYTE_ORDER=little_endian",
        "TYPE=unsigned_short",
        "SIZE1=2",
        "SIZE2=2",
    ]));
    let image = MarImage::from_bytes(&full).unwrap();
    assert!(!image.header().is_terminated());
    assert_eq!(image.to_bytes().unwrap(), full);
}

/// The minimal file with its text block replaced by `text`, padded with NUL.
fn file_with_text(text: &str) -> Vec<u8> {
    let mut file = minimal_file();
    file[..TEXT_HEADER_SIZE].fill(0);
    file[..text.len()].copy_from_slice(text.as_bytes());
    file
}

const REQUIRED_LINES: &str =
    "HEADER_BYTES=4096\nDIM=2\nBYTE_ORDER=little_endian\nTYPE=unsigned_short\nSIZE1=2\nSIZE2=2";

#[test]
fn last_line_without_delimiter() {
    let file = file_with_text(REQUIRED_LINES);
    let image = MarImage::from_bytes(&file).unwrap();
    assert!(!image.header().has_final_delimiter());
    assert_eq!(image.to_bytes().unwrap(), file);
}

#[test]
fn terminator_without_delimiter() {
    let file = file_with_text(&format!("{REQUIRED_LINES}\nEND"));
    let image = MarImage::from_bytes(&file).unwrap();
    assert!(image.header().is_terminated());
    assert_eq!(image.to_bytes().unwrap(), file);
}

#[test]
fn text_block_filled_to_the_edge() {
    let mut text = format!("{REQUIRED_LINES}\nCOMMENT=");
    text.push_str(&"x".repeat(TEXT_HEADER_SIZE - text.len()));
    let file = file_with_text(&text);
    let image = MarImage::from_bytes(&file).unwrap();
    let bytes = image.to_bytes().unwrap();
    assert_eq!(bytes, file);
    assert_eq!(MarImage::from_bytes(&bytes).unwrap(), image);
}

#[test]
fn larger_text_block_layout() {
    let layout = Layout {
        text_header_size: 2048,
        ..Layout::MARCCD
    };
    let mut file = text_block(&[
        "HEADER_BYTES=5120",
        "DIM=2",
        "BYTE_ORDER=little_endian",
        "TYPE=unsigned_char",
        "SIZE1=3",
        "SIZE2=1",
        "END",
    ]);
    file.resize(layout.text_header_size, 0);
    let mut metadata = vec![0u8; METADATA_SIZE];
    // nfast sits 80 bytes into the metadata block
    metadata[80..84].copy_from_slice(&3u32.to_le_bytes());
    file.extend_from_slice(&metadata);
    file.extend_from_slice(&[7, 8, 9]);

    let image = MarImage::from_bytes_with_layout(&file, layout).unwrap();
    assert_eq!(image.metadata().u32(names::NFAST), Some(3));
    assert_eq!(image.pixels().rows(), vec![vec![7, 8, 9]]);
    assert_eq!(image.to_bytes().unwrap(), file);
}

#[test]
fn vendor_keys_keep_their_order() {
    let mut file = minimal_file();
    file[..TEXT_HEADER_SIZE].copy_from_slice(&text_block(&[
        "DETECTOR=MARCCD 225",
        "HEADER_BYTES=4096",
        "DIM=2",
        "BYTE_ORDER=little_endian",
        "TYPE=unsigned_short",
        "SIZE1=2",
        "COMMENT=a=b",
        "SIZE2=2",
        "END",
    ]));
    let image = MarImage::from_bytes(&file).unwrap();
    let keys: Vec<&str> = image.header().iter().map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        ["DETECTOR", "HEADER_BYTES", "DIM", "BYTE_ORDER", "TYPE", "SIZE1", "COMMENT", "SIZE2"]
    );
    assert_eq!(image.header().get_key("COMMENT"), Some("a=b"));
    assert_eq!(image.to_bytes().unwrap(), file);
}

#[test]
fn text_trailer_is_preserved() {
    let mut file = minimal_file();
    let mut block = b"HEADER_BYTES=4096\nDIM=2\nBYTE_ORDER=little_endian\nTYPE=unsigned_short\nSIZE1=2\nSIZE2=2\nEND\n".to_vec();
    block.extend_from_slice(b"leftover scratch");
    block.resize(TEXT_HEADER_SIZE, 0);
    file[..TEXT_HEADER_SIZE].copy_from_slice(&block);

    let image = MarImage::from_bytes(&file).unwrap();
    assert_eq!(image.header().trailer(), b"leftover scratch");
    assert_eq!(image.to_bytes().unwrap(), file);
}

#[test]
fn reserved_metadata_bytes_survive_edit() {
    let mut file = minimal_file();
    // unnamed gaps between the goniostat and detector fields
    file[TEXT_HEADER_SIZE + 240] = 0xAB;
    file[TEXT_HEADER_SIZE + 2000] = 0xCD;

    let mut image = MarImage::from_bytes(&file).unwrap();
    image.set_wavelength(1.0).unwrap();
    image.set_header("OPERATOR", "beamline").unwrap();
    let out = image.to_bytes().unwrap();

    assert_eq!(out[TEXT_HEADER_SIZE + 240], 0xAB);
    assert_eq!(out[TEXT_HEADER_SIZE + 2000], 0xCD);
    assert_eq!(image.metadata().reserved()[240], 0xAB);
    assert_eq!(MarImage::from_bytes(&out).unwrap(), image);
}

#[test]
fn mixed_byte_order() {
    // Big-endian header fields, little-endian pixels.
    let mut file = minimal_file();
    file[..TEXT_HEADER_SIZE].copy_from_slice(&text_block(&[
        "HEADER_BYTES=4096",
        "DIM=2",
        "BYTE_ORDER=big_endian",
        "TYPE=unsigned_short",
        "SIZE1=2",
        "SIZE2=2",
        "END",
    ]));
    put_u32(&mut file, 28, 4321, ByteOrder::Big);
    put_u32(&mut file, 32, 1234, ByteOrder::Big);
    put_u32(&mut file, 80, 2, ByteOrder::Big);
    put_u32(&mut file, 84, 2, ByteOrder::Big);
    put_u32(&mut file, 88, 2, ByteOrder::Big);

    let image = MarImage::from_bytes(&file).unwrap();
    assert_eq!(image.header_byte_order(), Ok(ByteOrder::Big));
    assert_eq!(image.pixel_byte_order(), Ok(ByteOrder::Little));
    assert_eq!(image.metadata().u32(names::NFAST), Some(2));
    assert_eq!(image.pixels().rows(), vec![vec![1, 2], vec![3, 4]]);
    assert_eq!(image.to_bytes().unwrap(), file);
}

#[test]
fn big_endian_pixels_from_text_order() {
    let mut file = text_block(&[
        "HEADER_BYTES=4096",
        "DIM=2",
        "BYTE_ORDER=big_endian",
        "TYPE=unsigned_int",
        "SIZE1=1",
        "SIZE2=2",
        "END",
    ]);
    file.extend_from_slice(&[0u8; METADATA_SIZE]);
    file.extend_from_slice(&70000u32.to_be_bytes());
    file.extend_from_slice(&5u32.to_be_bytes());

    let image = MarImage::from_bytes(&file).unwrap();
    assert_eq!(image.pixels().rows(), vec![vec![70000], vec![5]]);
    assert_eq!(image.to_bytes().unwrap(), file);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn truncated_prefixes() {
    let file = minimal_file();
    for len in [0, 1, TEXT_HEADER_SIZE - 1] {
        assert!(matches!(
            MarImage::from_bytes(&file[..len]),
            Err(FormatError::TruncatedHeader { .. })
        ));
    }
    for len in [TEXT_HEADER_SIZE, TEXT_HEADER_SIZE + 1, HEADER_BYTES - 1] {
        assert!(matches!(
            MarImage::from_bytes(&file[..len]),
            Err(FormatError::TruncatedMetadata { .. })
        ));
    }
    for len in HEADER_BYTES..file.len() {
        assert_eq!(
            MarImage::from_bytes(&file[..len]).unwrap_err(),
            FormatError::TruncatedPixelData {
                needed: 8,
                available: len - HEADER_BYTES
            }
        );
    }
}

#[test]
fn wrong_header_bytes() {
    let mut file = minimal_file();
    file[..TEXT_HEADER_SIZE].copy_from_slice(&text_block(&[
        "HEADER_BYTES=1024",
        "DIM=2",
        "BYTE_ORDER=little_endian",
        "TYPE=unsigned_short",
        "SIZE1=2",
        "SIZE2=2",
        "END",
    ]));
    let err = MarImage::from_bytes(&file).unwrap_err();
    assert_eq!(invariant_of(err), "HEADER_BYTES == text block + metadata block");
}

#[test]
fn nfast_disagrees_with_size1() {
    let mut file = minimal_file();
    put_u32(&mut file, 80, 3, ByteOrder::Little);
    let err = MarImage::from_bytes(&file).unwrap_err();
    assert_eq!(invariant_of(err), "nfast == SIZE1");
}

#[test]
fn header_byte_order_disagrees() {
    let mut file = minimal_file();
    put_u32(&mut file, 28, 4321, ByteOrder::Little);
    let err = MarImage::from_bytes(&file).unwrap_err();
    assert_eq!(invariant_of(err), "header_byte_order == BYTE_ORDER");
}

#[test]
fn malformed_token() {
    let mut file = minimal_file();
    file[..TEXT_HEADER_SIZE].copy_from_slice(&text_block(&["HEADER_BYTES=4096", "garbage"]));
    assert_eq!(
        MarImage::from_bytes(&file).unwrap_err(),
        FormatError::MalformedField {
            token: String::from("garbage")
        }
    );
}

#[test]
fn missing_required_keyword() {
    let mut file = minimal_file();
    file[..TEXT_HEADER_SIZE].copy_from_slice(&text_block(&[
        "HEADER_BYTES=4096",
        "DIM=2",
        "BYTE_ORDER=little_endian",
        "TYPE=unsigned_short",
        "SIZE1=2",
        "END",
    ]));
    assert_eq!(
        MarImage::from_bytes(&file).unwrap_err(),
        FormatError::MissingKeyword("SIZE2")
    );
}

// ---------------------------------------------------------------------------
// Construction from arrays
// ---------------------------------------------------------------------------

#[test]
fn override_construction_3x5() {
    let grid = PixelGrid::zeros(3, 5, PixelType::UnsignedShort).unwrap();
    let image = MarImage::from_array(grid, Overrides::new()).unwrap();
    assert_eq!(image.header().get(Keyword::Size1), Some("3"));
    assert_eq!(image.header().get(Keyword::Size2), Some("5"));
    assert_eq!(image.to_bytes().unwrap().len(), HEADER_BYTES + 15 * 2);
}

#[test]
fn mismatched_override_fails() {
    let grid = PixelGrid::zeros(3, 5, PixelType::UnsignedShort).unwrap();
    let err = MarImage::from_array(grid, Overrides::new().text(Keyword::Size2, "4")).unwrap_err();
    assert_eq!(invariant_of(err), "SIZE2 == pixel grid height");
}

#[test]
fn degenerate_grid() {
    let grid = PixelGrid::zeros(0, 0, PixelType::UnsignedShort).unwrap();
    let image = MarImage::from_array(grid, Overrides::new()).unwrap();
    let bytes = image.to_bytes().unwrap();
    assert_eq!(bytes.len(), HEADER_BYTES);
    let decoded = MarImage::from_bytes(&bytes).unwrap();
    assert!(decoded.pixels().is_empty());
    assert_eq!(decoded, image);
}

#[test]
fn parameters_land_at_frame_offsets() {
    let grid = PixelGrid::zeros(4, 4, PixelType::UnsignedShort).unwrap();
    let overrides = Overrides::new()
        .distance(250.0)
        .center(2.0, 1.5)
        .pixel_size(79.59, 79.59)
        .wavelength(0.97625)
        .metadata(names::ACQUIRE_TIMESTAMP, FieldValue::text("010203042020.05.000000006"));
    let image = MarImage::from_array(grid, overrides).unwrap();
    let bytes = image.to_bytes().unwrap();
    let meta = &bytes[TEXT_HEADER_SIZE..HEADER_BYTES];

    let i32_at = |offset: usize| i32::from_le_bytes(meta[offset..offset + 4].try_into().unwrap());
    assert_eq!(i32_at(640), 250_000);
    assert_eq!(i32_at(696), 250_000);
    assert_eq!(i32_at(644), 2_000);
    assert_eq!(i32_at(648), 1_500);
    assert_eq!(i32_at(772), 79_590);
    assert_eq!(i32_at(776), 79_590);
    assert_eq!(i32_at(908), 97_625);

    let params = image.parameters();
    let acquired = params.acquired.unwrap();
    assert_eq!(acquired.to_string(), "2020-0102-0304-05-000000006");
    assert_eq!(image.center(), (2.0, 1.5));
}
