//! # Behavioral CSR Block Tests
//!
//! Register-transfer behavior of the behavioral PMP CSR block: write timing,
//! legalization, locking, illegal-address signalling, reset and the RAM hooks.

use csrtb_core::BehavioralCsrDut;
use csrtb_core::common::MemoryError;
use csrtb_core::config::{RegModelConfig, ResetPolarity};
use csrtb_core::dut::behavioral::{PmpAddrMatch, RAM_LOCATION, RAM_WORDS, legalize_lane, parse_vmem};
use csrtb_core::dut::{CsrDut, CsrOp, Dut};
use pretty_assertions::assert_eq;

use crate::common::images::temp_file;

/// One full clock period ending on a rising edge.
fn edge(dut: &mut BehavioralCsrDut) {
    dut.set_clock(false);
    dut.eval();
    dut.set_clock(true);
    dut.eval();
}

fn present(dut: &mut BehavioralCsrDut, addr: u32, op: CsrOp, wdata: u32) {
    let ports = dut.ports_mut();
    ports.csr_access_i = true;
    ports.instr_new_id_i = true;
    ports.csr_addr_i = addr;
    ports.csr_op_i = op.bits();
    ports.csr_wdata_i = wdata;
}

fn idle(dut: &mut BehavioralCsrDut) {
    let ports = dut.ports_mut();
    ports.csr_access_i = false;
    ports.instr_new_id_i = false;
}

/// Performs one transaction followed by an idle cycle; returns the sampled outputs.
fn access(dut: &mut BehavioralCsrDut, addr: u32, op: CsrOp, wdata: u32) -> (u32, bool) {
    present(dut, addr, op, wdata);
    edge(dut);
    let out = (dut.ports().csr_rdata_o, dut.ports().illegal_csr_insn_o);
    idle(dut);
    edge(dut);
    out
}

#[test]
fn test_starts_out_of_reset_with_zeroed_registers() {
    let dut = BehavioralCsrDut::default();
    assert!(dut.reset_line());
    assert_eq!(dut.entries().len(), 4);
    for addr in 0x3A0..=0x3BF {
        assert_eq!(dut.peek(addr), 0);
    }
}

#[test]
fn test_read_returns_value_before_write() {
    let mut dut = BehavioralCsrDut::default();
    present(&mut dut, 0x3B0, CsrOp::Write, 0x1234);
    edge(&mut dut);
    assert_eq!(dut.ports().csr_rdata_o, 0);
    assert_eq!(dut.peek(0x3B0), 0);

    present(&mut dut, 0x3B0, CsrOp::Write, 0x5678);
    edge(&mut dut);
    assert_eq!(dut.ports().csr_rdata_o, 0x1234);

    let (rdata, illegal) = access(&mut dut, 0x3B0, CsrOp::Read, 0);
    assert_eq!(rdata, 0x5678);
    assert!(!illegal);
}

#[test]
fn test_outputs_clear_without_transaction() {
    let mut dut = BehavioralCsrDut::default();
    let _ = access(&mut dut, 0x3B1, CsrOp::Write, 0xABCD);
    present(&mut dut, 0x3B1, CsrOp::Read, 0);
    edge(&mut dut);
    assert_eq!(dut.ports().csr_rdata_o, 0xABCD);
    idle(&mut dut);
    edge(&mut dut);
    assert_eq!(dut.ports().csr_rdata_o, 0);
}

#[test]
fn test_set_and_clear_on_address_register() {
    let mut dut = BehavioralCsrDut::default();
    let _ = access(&mut dut, 0x3B2, CsrOp::Write, 0xF0);
    let _ = access(&mut dut, 0x3B2, CsrOp::Set, 0x0F);
    assert_eq!(dut.peek(0x3B2), 0xFF);
    let _ = access(&mut dut, 0x3B2, CsrOp::Clear, 0xF0);
    assert_eq!(dut.peek(0x3B2), 0x0F);
}

#[test]
fn test_configuration_lanes_are_legalized() {
    let mut dut = BehavioralCsrDut::default();
    let _ = access(&mut dut, 0x3A0, CsrOp::Write, 0x0A0B_0C02);
    assert_eq!(dut.peek(0x3A0), 0x080B_0C00);
    let _ = access(&mut dut, 0x3A0, CsrOp::Write, 0x7F7F_7F7F);
    assert_eq!(dut.peek(0x3A0), 0x1F1F_1F1F);
}

#[test]
fn test_legalize_lane() {
    assert_eq!(legalize_lane(0xFF), 0x9F);
    assert_eq!(legalize_lane(0x02), 0x00);
    assert_eq!(legalize_lane(0x0A), 0x08);
    assert_eq!(legalize_lane(0x03), 0x03);
    assert_eq!(legalize_lane(0x60), 0x00);
}

#[test]
fn test_locked_lane_ignores_writes() {
    let mut dut = BehavioralCsrDut::default();
    let _ = access(&mut dut, 0x3A0, CsrOp::Write, 0x80);
    let _ = access(&mut dut, 0x3A0, CsrOp::Write, 0xFFFF_FFFF);
    assert_eq!(dut.peek(0x3A0), 0x9F9F_9F80);
    // 0x9F carries L, so every lane is frozen now.
    let _ = access(&mut dut, 0x3A0, CsrOp::Clear, 0xFFFF_FFFF);
    assert_eq!(dut.peek(0x3A0), 0x9F9F_9F80);
    assert!(dut.entries().iter().all(|e| e.is_locked()));
}

#[test]
fn test_locked_lane_freezes_own_address_register() {
    let mut dut = BehavioralCsrDut::default();
    let _ = access(&mut dut, 0x3A0, CsrOp::Write, 0x80);
    let _ = access(&mut dut, 0x3B0, CsrOp::Write, 5);
    let _ = access(&mut dut, 0x3B1, CsrOp::Write, 6);
    assert_eq!(dut.peek(0x3B0), 0);
    assert_eq!(dut.peek(0x3B1), 6);
}

#[test]
fn test_tor_region_freezes_address_register_below() {
    let mut dut = BehavioralCsrDut::default();
    let _ = access(&mut dut, 0x3A0, CsrOp::Write, 0x0000_0800);
    assert_eq!(dut.entries()[1].match_mode(), PmpAddrMatch::Tor);
    let _ = access(&mut dut, 0x3B0, CsrOp::Write, 0x100);
    let _ = access(&mut dut, 0x3B1, CsrOp::Write, 0x200);
    assert_eq!(dut.peek(0x3B0), 0);
    assert_eq!(dut.peek(0x3B1), 0x200);
}

#[test]
fn test_last_region_has_no_tor_neighbour() {
    let mut dut = BehavioralCsrDut::default();
    let _ = access(&mut dut, 0x3A0, CsrOp::Write, 0x0808_0800);
    let _ = access(&mut dut, 0x3B3, CsrOp::Write, 0xCAFE);
    assert_eq!(dut.peek(0x3B3), 0xCAFE);
}

#[test]
fn test_unimplemented_registers_read_zero_without_error() {
    let mut dut = BehavioralCsrDut::default();
    for addr in [0x3A1, 0x3A3, 0x3B4, 0x3BF] {
        let (rdata, illegal) = access(&mut dut, addr, CsrOp::Write, 0xFFFF_FFFF);
        assert_eq!(rdata, 0);
        assert!(!illegal, "{addr:#x} flagged illegal");
        assert_eq!(dut.peek(addr), 0);
    }
}

#[test]
fn test_addresses_outside_the_map_are_illegal() {
    let mut dut = BehavioralCsrDut::default();
    for addr in [0x300, 0x39F, 0x3A4, 0x3AF, 0x3C0] {
        let (rdata, illegal) = access(&mut dut, addr, CsrOp::Write, 0x1);
        assert_eq!(rdata, 0);
        assert!(illegal, "{addr:#x} not flagged");
    }
}

#[test]
fn test_reset_clears_registers() {
    let mut dut = BehavioralCsrDut::default();
    let _ = access(&mut dut, 0x3A0, CsrOp::Write, 0x8080_8080);
    let _ = access(&mut dut, 0x3B0, CsrOp::Write, 0x1);
    dut.set_reset_line(false);
    edge(&mut dut);
    dut.set_reset_line(true);
    assert_eq!(dut.peek(0x3A0), 0);
    let _ = access(&mut dut, 0x3B0, CsrOp::Write, 0x77);
    assert_eq!(dut.peek(0x3B0), 0x77);
}

#[test]
fn test_reset_drops_pending_write() {
    let mut dut = BehavioralCsrDut::default();
    present(&mut dut, 0x3B0, CsrOp::Write, 0x42);
    edge(&mut dut);
    idle(&mut dut);
    dut.set_reset_line(false);
    edge(&mut dut);
    dut.set_reset_line(true);
    edge(&mut dut);
    assert_eq!(dut.peek(0x3B0), 0);
}

#[test]
fn test_transactions_during_reset_are_ignored() {
    let mut dut = BehavioralCsrDut::default();
    dut.set_reset_line(false);
    present(&mut dut, 0x3B0, CsrOp::Write, 0x42);
    edge(&mut dut);
    assert_eq!(dut.ports().csr_rdata_o, 0);
    dut.set_reset_line(true);
    idle(&mut dut);
    edge(&mut dut);
    assert_eq!(dut.peek(0x3B0), 0);
}

#[test]
fn test_positive_polarity_reset() {
    let mut dut = BehavioralCsrDut::new(&RegModelConfig::default(), ResetPolarity::Positive);
    assert!(!dut.reset_line());
    let _ = access(&mut dut, 0x3B0, CsrOp::Write, 0x9);
    assert_eq!(dut.peek(0x3B0), 0x9);
    dut.set_reset_line(true);
    edge(&mut dut);
    assert_eq!(dut.peek(0x3B0), 0);
}

#[test]
fn test_eight_regions_use_two_configuration_registers() {
    let map = RegModelConfig {
        num_regions: 8,
        ..RegModelConfig::default()
    };
    let mut dut = BehavioralCsrDut::new(&map, ResetPolarity::Negative);
    assert_eq!(dut.entries().len(), 8);
    let _ = access(&mut dut, 0x3A1, CsrOp::Write, 0x0800_0000);
    assert_eq!(dut.peek(0x3A1), 0x0800_0000);
    let _ = access(&mut dut, 0x3B6, CsrOp::Write, 0x66);
    assert_eq!(dut.peek(0x3B6), 0);
    let _ = access(&mut dut, 0x3B7, CsrOp::Write, 0x77);
    assert_eq!(dut.peek(0x3B7), 0x77);
}

#[test]
fn test_only_rising_edges_advance_state() {
    let mut dut = BehavioralCsrDut::default();
    present(&mut dut, 0x3B0, CsrOp::Write, 0x5);
    dut.set_clock(true);
    dut.eval();
    dut.eval();
    dut.set_clock(false);
    dut.eval();
    assert_eq!(dut.peek(0x3B0), 0);
    idle(&mut dut);
    dut.set_clock(true);
    dut.eval();
    assert_eq!(dut.peek(0x3B0), 0x5);
}

#[test]
fn test_trace_signals_cover_the_port_bundle() {
    let dut = BehavioralCsrDut::default();
    let names: Vec<_> = dut.trace_signals().iter().map(|s| s.name).collect();
    assert_eq!(
        names,
        vec![
            "clk_i",
            "rst_ni",
            "csr_access_i",
            "instr_new_id_i",
            "csr_addr_i",
            "csr_op_i",
            "csr_wdata_i",
            "csr_rdata_o",
            "illegal_csr_insn_o",
        ]
    );
}

#[test]
fn test_finish_and_finalize_hooks() {
    let mut dut = BehavioralCsrDut::default();
    assert!(!dut.got_finish());
    dut.request_finish();
    assert!(dut.got_finish());
    assert!(!dut.is_finalized());
    dut.finalize();
    assert!(dut.is_finalized());
}

#[test]
fn test_ram_word_writes() {
    let mut dut = BehavioralCsrDut::default();
    dut.write_memory_word(RAM_LOCATION, 3, 0xDEAD_BEEF).unwrap();
    assert_eq!(dut.ram()[3], 0xDEAD_BEEF);

    let err = dut.write_memory_word(RAM_LOCATION, RAM_WORDS, 1).unwrap_err();
    assert!(matches!(err, MemoryError::IndexOutOfRange { index, .. } if index == RAM_WORDS));

    let err = dut.write_memory_word("TOP.csr_tb.u_rom", 0, 1).unwrap_err();
    assert_eq!(
        err,
        MemoryError::NoMemoryAt {
            location: "TOP.csr_tb.u_rom".into()
        }
    );
}

#[test]
fn test_parse_vmem() {
    let text = "// header\n@10 DEADBEEF 1\n00000002 // tail\n\n@0 ff\n";
    let words = parse_vmem(text).unwrap();
    assert_eq!(
        words,
        vec![(0x10, 0xDEAD_BEEF), (0x11, 1), (0x12, 2), (0, 0xFF)]
    );
}

#[test]
fn test_parse_vmem_rejects_bad_tokens() {
    let err = parse_vmem("00000001\nzz\n").unwrap_err();
    assert!(err.contains("line 2"), "{err}");
    let err = parse_vmem("@xyz 1").unwrap_err();
    assert!(err.contains("bad address"), "{err}");
}

#[test]
fn test_load_vmem_into_ram() {
    let file = temp_file(b"@4\n11111111 22222222\n", ".vmem");
    let mut dut = BehavioralCsrDut::default();
    dut.load_vmem(RAM_LOCATION, file.path()).unwrap();
    assert_eq!(&dut.ram()[3..7], &[0, 0x1111_1111, 0x2222_2222, 0]);
}

#[test]
fn test_load_vmem_reports_bad_image() {
    let file = temp_file(b"nothex\n", ".vmem");
    let mut dut = BehavioralCsrDut::default();
    let err = dut.load_vmem(RAM_LOCATION, file.path()).unwrap_err();
    assert!(matches!(err, MemoryError::InvalidImage { .. }));
    let err = dut.load_vmem("TOP.other", file.path()).unwrap_err();
    assert!(matches!(err, MemoryError::NoMemoryAt { .. }));
}
