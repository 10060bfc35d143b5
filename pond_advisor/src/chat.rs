//! Chat-style consultation on a terminal.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use tracing::{debug, warn};

use crate::action::Action;
use crate::advisor::{Advisor, RawReadings, Recommendation};

/// How a consultation ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChatOutcome {
    Recommended(Action),
    UnknownCondition,
    InvalidInput,
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    write!(output, "{}", question)?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read from input")?;
    Ok(line.trim().to_string())
}

/// Ask for the three readings and print the advisor's answer.
pub fn run_consultation<R: BufRead, W: Write>(
    advisor: &Advisor,
    input: &mut R,
    output: &mut W,
) -> Result<ChatOutcome> {
    writeln!(output, "\n🐟 Welcome to Catfish Pond Water Advisor!\n")?;

    let temperature = prompt(input, output, "🌡️  Enter water temperature (°C): ")?;
    let ph = prompt(input, output, "🧪 Enter water pH level: ")?;
    let dissolved_oxygen = prompt(input, output, "💨 Enter dissolved oxygen level (mg/L): ")?;

    let raw = RawReadings {
        temperature: &temperature,
        ph: &ph,
        dissolved_oxygen: &dissolved_oxygen,
    };
    let readings = match raw.parse() {
        Ok(readings) => readings,
        Err(e) => {
            warn!("Rejected consultation input: {}", e);
            writeln!(output, "⚠️  Invalid input. Please enter numeric values.")?;
            return Ok(ChatOutcome::InvalidInput);
        }
    };

    match advisor.recommend(&readings) {
        Recommendation::UnknownCondition { state } => {
            debug!(%state, "No learned policy for state");
            writeln!(
                output,
                "\n🤖 Sorry, I haven't learned about this condition yet. Try adjusting slightly."
            )?;
            Ok(ChatOutcome::UnknownCondition)
        }
        Recommendation::Act { action, .. } => {
            writeln!(output, "\n🤖 Based on your input:")?;
            writeln!(output, "- Temperature: {}°C", readings.temperature)?;
            writeln!(output, "- pH Level: {}", readings.ph)?;
            writeln!(output, "- Dissolved Oxygen: {} mg/L", readings.dissolved_oxygen)?;
            writeln!(output, "\n✅ Recommended Action: {}", action.label())?;
            Ok(ChatOutcome::Recommended(action))
        }
    }
}
