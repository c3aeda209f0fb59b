use pcbcam_core::format::{decode, encode, CoordinateCodec};
use pcbcam_core::{FormatConfig, Units, ZeroSuppression};
use proptest::prelude::*;

fn mode() -> impl Strategy<Value = ZeroSuppression> {
    prop_oneof![Just(ZeroSuppression::Leading), Just(ZeroSuppression::Trailing)]
}

proptest! {
    #[test]
    fn zero_suppression_is_invertible(
        int_digits in 1u8..=4,
        dec_digits in 0u8..=5,
        zeros in mode(),
        raw in any::<i64>(),
    ) {
        let limit = 10i64.pow((int_digits + dec_digits) as u32);
        let n = raw % limit;
        let v = n as f64 / 10f64.powi(dec_digits as i32);

        let text = encode(v, int_digits, dec_digits, zeros).unwrap();
        prop_assert!(!text.contains('.'));
        let back = decode(&text, int_digits, dec_digits, zeros).unwrap();
        prop_assert_eq!(back, v);
    }

    #[test]
    fn encoded_length_never_exceeds_layout(v in -99.9999f64..99.9999, zeros in mode()) {
        let text = encode(v, 2, 4, zeros).unwrap();
        prop_assert!(text.trim_start_matches('-').len() <= 6);
    }
}

#[test]
fn test_scaled_codec_round_trip() {
    let cfg = FormatConfig::new(Units::Inch, 2, 4, ZeroSuppression::Trailing);
    let codec = cfg.codec_from(Units::Mm);
    let text = codec.encode(12.7).unwrap();
    assert_eq!(text, "005");
    assert!((codec.decode(&text).unwrap() - 12.7).abs() < 1e-9);
}

#[test]
fn test_layout_is_validated() {
    let codec = CoordinateCodec::new(0, 4, ZeroSuppression::Leading);
    assert!(codec.encode(1.0).is_err());
    assert!(FormatConfig::new(Units::Mm, 0, 4, ZeroSuppression::Leading)
        .validate()
        .is_err());
    assert!(FormatConfig::default().validate().is_ok());
}
