//! OpenQASM 3 emitter for sampler submissions.

use std::f64::consts::PI;
use std::fmt::Write;

use qcat_ir::{Circuit, ClbitId, Instruction, InstructionKind, QubitId};

use crate::error::{IbmError, IbmResult};

/// Emit `circuit` as OpenQASM 3 with the `stdgates.inc` include.
pub fn emit(circuit: &Circuit) -> IbmResult<String> {
    let mut out = String::new();
    writeln!(out, "OPENQASM 3.0;").map_err(fmt_error)?;
    writeln!(out, "include \"stdgates.inc\";").map_err(fmt_error)?;

    if circuit.num_qubits() > 0 {
        writeln!(out, "qubit[{}] q;", circuit.num_qubits()).map_err(fmt_error)?;
    }
    if circuit.num_clbits() > 0 {
        writeln!(out, "bit[{}] c;", circuit.num_clbits()).map_err(fmt_error)?;
    }

    for instruction in circuit.instructions() {
        emit_instruction(&mut out, instruction).map_err(fmt_error)?;
    }
    Ok(out)
}

fn fmt_error(e: std::fmt::Error) -> IbmError {
    IbmError::CircuitError(format!("failed to format OpenQASM: {e}"))
}

fn emit_instruction(out: &mut String, instruction: &Instruction) -> std::fmt::Result {
    let qubits = qubit_list(&instruction.qubits);
    match &instruction.kind {
        InstructionKind::Gate(gate) => {
            let params = gate.parameters();
            if params.is_empty() {
                writeln!(out, "{} {qubits};", gate.name())
            } else {
                let params: Vec<String> = params.iter().map(|p| angle(*p)).collect();
                writeln!(out, "{}({}) {qubits};", gate.name(), params.join(", "))
            }
        }
        InstructionKind::Measure => {
            for (q, c) in instruction.qubits.iter().zip(&instruction.clbits) {
                writeln!(out, "{} = measure {};", clbit(*c), qubit(*q))?;
            }
            Ok(())
        }
        InstructionKind::Reset => writeln!(out, "reset {qubits};"),
        InstructionKind::Barrier if qubits.is_empty() => writeln!(out, "barrier;"),
        InstructionKind::Barrier => writeln!(out, "barrier {qubits};"),
    }
}

fn qubit(q: QubitId) -> String {
    format!("q[{}]", q.0)
}

fn clbit(c: ClbitId) -> String {
    format!("c[{}]", c.0)
}

fn qubit_list(qubits: &[QubitId]) -> String {
    qubits
        .iter()
        .map(|q| qubit(*q))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Common fractions of pi are written symbolically.
fn angle(v: f64) -> String {
    const NAMED: [(f64, &str); 6] = [
        (PI, "pi"),
        (-PI, "-pi"),
        (PI / 2.0, "pi/2"),
        (-PI / 2.0, "-pi/2"),
        (PI / 4.0, "pi/4"),
        (-PI / 4.0, "-pi/4"),
    ];
    NAMED
        .iter()
        .find(|(value, _)| (v - value).abs() < 1e-10)
        .map_or_else(|| format!("{v}"), |(_, name)| (*name).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_bell() {
        let qasm = emit(&Circuit::bell().unwrap()).unwrap();
        let expected = "OPENQASM 3.0;\n\
                        include \"stdgates.inc\";\n\
                        qubit[2] q;\n\
                        bit[2] c;\n\
                        h q[0];\n\
                        cx q[0], q[1];\n\
                        c[0] = measure q[0];\n\
                        c[1] = measure q[1];\n";
        assert_eq!(qasm, expected);
    }

    #[test]
    fn test_emit_parameters() {
        let mut circuit = Circuit::with_size("p", 2, 0);
        circuit
            .rx(PI / 2.0, QubitId(0))
            .unwrap()
            .u(0.25, -PI, PI / 4.0, QubitId(1))
            .unwrap()
            .cp(1.5, QubitId(0), QubitId(1))
            .unwrap()
            .reset(QubitId(1))
            .unwrap()
            .barrier(Vec::<QubitId>::new())
            .unwrap();

        let qasm = emit(&circuit).unwrap();
        assert!(qasm.contains("rx(pi/2) q[0];"));
        assert!(qasm.contains("u(0.25, -pi, pi/4) q[1];"));
        assert!(qasm.contains("cp(1.5) q[0], q[1];"));
        assert!(qasm.contains("reset q[1];"));
        assert!(qasm.contains("barrier;"));
        assert!(!qasm.contains("bit["));
    }
}
