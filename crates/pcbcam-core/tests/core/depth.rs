use pcbcam_core::MachiningParams;
use proptest::prelude::*;

proptest! {
    #[test]
    fn multidepth_ends_exactly_at_cut_z(cut in 0.01f64..10.0, dpp in 0.01f64..5.0) {
        let params = MachiningParams {
            cut_z: -cut,
            multidepth: true,
            depth_per_pass: dpp,
            ..Default::default()
        };
        let levels = params.depth_levels();
        let expected = ((cut / dpp - 1e-9).ceil() as usize).max(1);

        prop_assert_eq!(levels.len(), expected);
        prop_assert_eq!(*levels.last().unwrap(), -cut);
        for z in &levels {
            prop_assert!(*z >= -cut);
        }
        for pair in levels.windows(2) {
            prop_assert!(pair[1] < pair[0]);
        }
    }
}

#[test]
fn test_whole_number_of_passes_has_no_extra_level() {
    let params = MachiningParams {
        cut_z: -1.1,
        multidepth: true,
        depth_per_pass: 0.1,
        ..Default::default()
    };
    let levels = params.depth_levels();
    assert_eq!(levels.len(), 11);
    assert_eq!(*levels.last().unwrap(), -1.1);
    assert!((levels[9] + 1.0).abs() < 1e-9);
}

#[test]
fn test_depth_per_pass_deeper_than_cut() {
    let params = MachiningParams {
        cut_z: -0.5,
        multidepth: true,
        depth_per_pass: 2.0,
        ..Default::default()
    };
    assert_eq!(params.depth_levels(), vec![-0.5]);
}
