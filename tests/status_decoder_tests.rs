use obdh_antenna::protocol::{AntennaId, STATUS_MASK};
use obdh_antenna::status::*;

fn bit(raw: u16, n: u16) -> bool {
    raw & (1 << n) != 0
}

#[test]
fn test_every_word_decodes_to_its_bits() {
    for raw in 0..=u16::MAX {
        let status = decode_status(raw);
        assert_eq!(status.code, raw);

        for (antenna, top) in AntennaId::ALL.iter().zip([15u16, 11, 7, 3]) {
            let channel = status.channel(*antenna);
            assert_eq!(channel.deployed, !bit(raw, top), "{} deployed in 0x{:04X}", antenna, raw);
            assert_eq!(channel.stopped_by_timeout, bit(raw, top - 1));
            assert_eq!(channel.burning_active, bit(raw, top - 2));
        }
        assert_eq!(status.ignoring_switches, bit(raw, 8));
        assert_eq!(status.independent_burn_active, bit(raw, 4));
        assert_eq!(status.armed, bit(raw, 0));
    }
}

#[test]
fn test_all_clear_word_is_fully_deployed() {
    let status = decode_status(0x0000);
    assert!(status.all_deployed());
    assert!(!status.any_burning());
    assert!(!status.armed);
    assert!(!status.ignoring_switches);
    assert!(!status.independent_burn_active);
}

#[test]
fn test_all_set_word() {
    let status = decode_status(0xFFFF);
    assert_eq!(status.deployed_count(), 0);
    assert!(status.antennas.iter().all(|a| a.stopped_by_timeout && a.burning_active));
    assert!(status.ignoring_switches);
    assert!(status.independent_burn_active);
    assert!(status.armed);
}

#[test]
fn test_power_on_word_is_all_stowed() {
    let status = decode_status(STATUS_MASK);
    assert_eq!(status.deployed_count(), 0);
    assert!(status.antennas.iter().all(|a| !a.stopped_by_timeout && !a.burning_active));
    assert!(!status.armed);
    assert_eq!(status, DeploymentStatus::default());
}

#[test]
fn test_single_antenna_deployed() {
    // Only ANT3's switch released.
    let status = decode_status(0x8808);
    assert!(!status.channel(AntennaId::Ant1).deployed);
    assert!(!status.channel(AntennaId::Ant2).deployed);
    assert!(status.channel(AntennaId::Ant3).deployed);
    assert!(!status.channel(AntennaId::Ant4).deployed);
    assert_eq!(status.deployed_count(), 1);
}

#[test]
fn test_summary_lines() {
    assert_eq!(
        decode_status(0x8888).summary().as_str(),
        "code=0x8888 ANT1=stowed ANT2=stowed ANT3=stowed ANT4=stowed armed=no"
    );
    // ANT1 burning, ANT2 timed out, ANT3 and ANT4 deployed, armed.
    assert_eq!(
        decode_status(0xAC01).summary().as_str(),
        "code=0xAC01 ANT1=burning ANT2=timeout ANT3=deployed ANT4=deployed armed=yes"
    );
    assert!(decode_status(0xFFFF).summary().ends_with("armed=yes ignoring-switches independent-burn"));
}
