// src/nn/summary.rs
// Layer table of a built network for a given input shape.

use std::fmt;

/// One top-level layer of a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSummary {
    pub name: String,
    pub kind: &'static str,
    pub output_shape: Vec<usize>,
    pub num_parameters: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub input_shape: Vec<usize>,
    pub layers: Vec<LayerSummary>,
}

impl Summary {
    pub fn total_parameters(&self) -> usize {
        self.layers.iter().map(|l| l.num_parameters).sum()
    }

    /// Shape after the last layer, or the input shape for an empty network.
    pub fn output_shape(&self) -> &[usize] {
        self.layers
            .last()
            .map_or(&self.input_shape, |l| &l.output_shape)
    }
}

fn format_shape(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    format!("[{}]", dims.join(", "))
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(72);
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "{:<14} {:<16} {:<26} {:>12}",
            "Layer", "Type", "Output shape", "Params"
        )?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "{:<14} {:<16} {:<26} {:>12}",
            "input",
            "Input",
            format_shape(&self.input_shape),
            0
        )?;
        for layer in &self.layers {
            writeln!(
                f,
                "{:<14} {:<16} {:<26} {:>12}",
                layer.name,
                layer.kind,
                format_shape(&layer.output_shape),
                layer.num_parameters
            )?;
        }
        writeln!(f, "{rule}")?;
        write!(f, "Total params: {}", self.total_parameters())
    }
}
