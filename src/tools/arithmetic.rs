//! add / subtract / multiply / divide

use async_trait::async_trait;
use serde_json::Value;

use super::{ParamKind, ParamSpec, Tool, ToolDescriptor, ToolFailure, ToolName, ToolOutcome, number_arg};

/// Exact text the model receives for `divide` with a zero divisor
pub const DIVIDE_BY_ZERO: &str = "Error: Cannot divide by zero.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    pub const ALL: [ArithmeticOp; 4] = [
        ArithmeticOp::Add,
        ArithmeticOp::Subtract,
        ArithmeticOp::Multiply,
        ArithmeticOp::Divide,
    ];

    pub fn tool_name(&self) -> ToolName {
        match self {
            ArithmeticOp::Add => ToolName::Add,
            ArithmeticOp::Subtract => ToolName::Subtract,
            ArithmeticOp::Multiply => ToolName::Multiply,
            ArithmeticOp::Divide => ToolName::Divide,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "Adds two numbers.",
            ArithmeticOp::Subtract => "Subtracts the second number from the first.",
            ArithmeticOp::Multiply => "Multiplies two numbers.",
            ArithmeticOp::Divide => "Divides the first number by the second.",
        }
    }

    pub fn apply(&self, a: f64, b: f64) -> Result<f64, ToolFailure> {
        match self {
            ArithmeticOp::Add => Ok(a + b),
            ArithmeticOp::Subtract => Ok(a - b),
            ArithmeticOp::Multiply => Ok(a * b),
            ArithmeticOp::Divide if b == 0.0 => Err(ToolFailure::invalid(DIVIDE_BY_ZERO)),
            ArithmeticOp::Divide => Ok(a / b),
        }
    }
}

/// Pure two-operand arithmetic over `a` and `b`
pub struct ArithmeticTool {
    op: ArithmeticOp,
}

impl ArithmeticTool {
    pub fn new(op: ArithmeticOp) -> Self {
        Self { op }
    }
}

#[async_trait]
impl Tool for ArithmeticTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.op.tool_name(),
            description: self.op.description(),
            params: vec![
                ParamSpec::required("a", ParamKind::Number),
                ParamSpec::required("b", ParamKind::Number),
            ],
        }
    }

    async fn execute(&self, args: &Value) -> ToolOutcome {
        let a = number_arg(args, "a")?;
        let b = number_arg(args, "b")?;
        self.op.apply(a, b).map(|value| value.to_string())
    }
}
