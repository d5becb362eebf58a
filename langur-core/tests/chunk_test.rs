// langur-core - Instruction codec tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use langur_core::chunk::{make, read_operands, read_u16, read_u8, Instructions};
use langur_core::opcode::Op;

#[test]
fn test_make() {
    let cases: &[(Op, &[usize], &[u8])] = &[
        (Op::Constant, &[65534], &[255, 254]),
        (Op::Add, &[], &[]),
        (Op::GetLocal, &[255], &[255]),
        (Op::Closure, &[65534, 255], &[255, 254, 255]),
    ];

    for (op, operands, operand_bytes) in cases {
        let mut expected = vec![u8::from(*op)];
        expected.extend_from_slice(operand_bytes);
        assert_eq!(make(*op, operands), expected, "make({:?}, {:?})", op, operands);
    }
}

#[test]
fn test_read_operands() {
    let cases: &[(Op, &[usize], usize)] = &[
        (Op::Constant, &[65535], 2),
        (Op::GetLocal, &[255], 1),
        (Op::Closure, &[65535, 255], 3),
        (Op::Add, &[], 0),
    ];

    for (op, operands, bytes_read) in cases {
        let encoded = make(*op, operands);
        let (decoded, read) = read_operands(*op, &encoded[1..]);
        assert_eq!(read, *bytes_read, "bytes read for {:?}", op);
        assert_eq!(&decoded, operands, "operands for {:?}", op);
    }
}

#[test]
fn test_primitive_readers() {
    assert_eq!(read_u16(&[0x01, 0x02]), 0x0102);
    assert_eq!(read_u16(&[0xff, 0xfe]), 0xfffe);
    assert_eq!(read_u8(&[0x2a]), 42);
}

#[test]
fn test_instructions_display() {
    let stream = [
        make(Op::Add, &[]),
        make(Op::GetLocal, &[1]),
        make(Op::Constant, &[2]),
        make(Op::Constant, &[65535]),
        make(Op::Closure, &[65535, 255]),
    ]
    .concat();
    let instructions = Instructions(stream);

    let expected = "\
0000 OpAdd
0001 OpGetLocal 1
0003 OpConstant 2
0006 OpConstant 65535
0009 OpClosure 65535 255
";
    assert_eq!(instructions.to_string(), expected);
}

#[test]
fn test_instructions_display_is_total() {
    // An undefined opcode renders an error line and decoding resumes at
    // the next byte.
    let mut stream = vec![200u8];
    stream.extend(make(Op::True, &[]));
    let instructions = Instructions(stream);

    let expected = "\
ERROR: opcode 200 undefined
0001 OpTrue
";
    assert_eq!(instructions.to_string(), expected);

    // Truncated operands also render as an error rather than panicking
    let truncated = Instructions(vec![u8::from(Op::Constant), 0x01]);
    assert_eq!(
        truncated.to_string(),
        "ERROR: truncated operands for OpConstant\n"
    );
}

#[test]
fn test_every_opcode_round_trips_through_u8() {
    for byte in 0u8..=255 {
        match Op::try_from(byte) {
            Ok(op) => assert_eq!(u8::from(op), byte),
            Err(_) => assert!(byte > u8::from(Op::CurrentClosure)),
        }
    }
}
