//! Port descriptors for the stage system.
//!
//! Each stage reports its ports (the conduits it reads and writes) so the
//! supervisor can log and snapshot the wiring of a pipeline.

/// The kind of data flowing through a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    /// Scalar values.
    Value,
    /// Fixed-width tuples from a join.
    Tuple,
    /// Rendered text (reports, formatted output).
    Text,
    /// A byte stream outside the pipeline (stdin, stdout, a file).
    External,
}

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// Descriptor for one of a stage's ports, named after its conduit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    pub name: String,
    pub direction: PortDirection,
    pub kind: PortKind,
}

impl PortDescriptor {
    pub fn input(name: impl Into<String>, kind: PortKind) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Input,
            kind,
        }
    }

    pub fn output(name: impl Into<String>, kind: PortKind) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Output,
            kind,
        }
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }
}

/// Count of (inputs, outputs) in a port list.
pub fn fan(ports: &[PortDescriptor]) -> (usize, usize) {
    let inputs = ports.iter().filter(|p| p.is_input()).count();
    (inputs, ports.len() - inputs)
}
