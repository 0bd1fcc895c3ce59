use bq2589x_dual::classifier::{detect_edge, level_flags, AdapterEvent};
use bq2589x_dual::data_types::{ChargeStatus, ChargeType, PartNumber, Role, SourceType, StatusFlags};
use bq2589x_dual::registers::{field, FaultBits, MiscCtrlBits, StatusBits};

#[test]
fn status_decode_sources() {
    let cases = [
        (0b000, SourceType::None),
        (0b001, SourceType::UsbSdp),
        (0b010, SourceType::UsbCdp),
        (0b011, SourceType::UsbDcp),
        (0b100, SourceType::MaxCharge),
        (0b101, SourceType::Unknown),
        (0b110, SourceType::NonStandard),
        (0b111, SourceType::Otg),
    ];
    for (code, source) in cases {
        let raw = field::VBUS_STAT.encode(code) | StatusBits::PG_STAT.bits();
        assert_eq!(SourceType::from_code(field::VBUS_STAT.decode(raw)), source);
    }
}

#[test]
fn attached_sources() {
    assert!(SourceType::UsbSdp.is_attached());
    assert!(SourceType::UsbDcp.is_attached());
    assert!(SourceType::MaxCharge.is_attached());
    assert!(!SourceType::None.is_attached());
    assert!(!SourceType::Otg.is_attached());
    assert!(!SourceType::NotDetermined.is_attached());
}

#[test]
fn usb_and_wall_partition() {
    assert!(SourceType::UsbSdp.is_usb());
    assert!(SourceType::UsbDcp.is_usb());
    assert!(!SourceType::UsbCdp.is_usb());
    assert!(SourceType::MaxCharge.is_wall());
    assert!(SourceType::NonStandard.is_wall());
    assert!(!SourceType::UsbDcp.is_wall());
}

#[test]
fn charge_status_maps_to_charge_type() {
    let raw = field::CHRG_STAT.encode(0b10);
    let status = ChargeStatus::from_code(field::CHRG_STAT.decode(raw));
    assert_eq!(status, ChargeStatus::FastCharging);
    assert_eq!(ChargeType::from(status), ChargeType::Fast);
    assert_eq!(ChargeType::from(ChargeStatus::PreCharge), ChargeType::Trickle);
    assert_eq!(ChargeType::from(ChargeStatus::Done), ChargeType::None);
}

#[test]
fn edges_only_on_transition() {
    assert_eq!(detect_edge(false, SourceType::UsbDcp), Some(AdapterEvent::Inserted));
    assert_eq!(detect_edge(true, SourceType::UsbDcp), None);
    assert_eq!(detect_edge(true, SourceType::None), Some(AdapterEvent::Removed));
    assert_eq!(detect_edge(false, SourceType::None), None);
    assert_eq!(detect_edge(false, SourceType::Otg), None);
}

#[test]
fn level_flags_follow_snapshot() {
    let flags = level_flags(StatusBits::PG_STAT, FaultBits::empty());
    assert_eq!(flags, StatusFlags::POWER_GOOD);

    let flags = level_flags(StatusBits::empty(), FaultBits::WATCHDOG | FaultBits::NTC1);
    assert_eq!(flags, StatusFlags::FAULT);
}

#[test]
fn part_numbers_match_roles() {
    assert_eq!(Role::Primary.expected_part(), PartNumber::Bq25890);
    assert_eq!(Role::Secondary.expected_part(), PartNumber::Bq25892);
    assert_eq!(Role::Primary.address(), 0x6A);
    assert_eq!(Role::Secondary.address(), 0x6B);

    let device = 0x19;
    assert_eq!(PartNumber::from_code(field::PN.decode(device)), Some(PartNumber::Bq25890));
    assert_eq!(field::DEV_REV.decode(device), 1);
    assert_eq!(PartNumber::from_code(0x05), None);
}

#[test]
fn pump_fields_share_misc_register() {
    assert_eq!(field::PUMPX_UP.reg, field::PUMPX_DN.reg);
    assert_eq!(field::PUMPX_UP.encode(1), 0x02);
    assert_eq!(field::PUMPX_DN.encode(1), 0x01);
    assert_eq!(field::FORCE_ICO.encode(1), 0x80);

    let both = MiscCtrlBits::from_bits_retain(field::PUMPX_UP.encode(1) | field::PUMPX_DN.encode(1));
    assert_eq!(both, MiscCtrlBits::PUMPX_UP | MiscCtrlBits::PUMPX_DN);
    assert!(!both.contains(MiscCtrlBits::FORCE_ICO));
}
