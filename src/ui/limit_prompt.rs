use anyhow::{bail, Result};
use dialoguer::{theme::ColorfulTheme, Input, Select};

use crate::pull::limit::{LimitChoice, LimitDecision, LimitNegotiator, LimitSituation};
use crate::utils::{format_bytes, parse_byte_size};

use super::is_interactive;

/// Asks the operator how the byte budget should apply to this run.
pub struct InteractiveLimitPrompt;

impl LimitNegotiator for InteractiveLimitPrompt {
    fn negotiate(&self, situation: LimitSituation) -> Result<LimitDecision> {
        if !is_interactive() {
            bail!("interactive limit selection requires a TTY; pass --limit-bytes, --extend-bytes, --unlimited or --yes");
        }

        let choices = situation.offered_choices();
        let labels: Vec<&str> = choices.iter().map(|choice| choice.label()).collect();
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(situation_prompt(&situation))
            .items(&labels)
            .default(0)
            .interact()?;
        let choice = choices[selection];

        let amount = if choice.needs_amount() {
            Some(prompt_amount(choice)?)
        } else {
            None
        };
        Ok(decision_for(choice, amount))
    }
}

fn situation_prompt(situation: &LimitSituation) -> String {
    match *situation {
        LimitSituation::NoPriorLimit { downloaded: 0 } => {
            "No download in progress. Limit how much to download?".to_string()
        }
        LimitSituation::NoPriorLimit { downloaded } => format!(
            "{} downloaded so far without a limit. Limit the rest?",
            format_bytes(downloaded as f64)
        ),
        LimitSituation::UnderLimit { limit, downloaded } => format!(
            "{} of the {} limit downloaded. How should this run continue?",
            format_bytes(downloaded as f64),
            format_bytes(limit as f64)
        ),
        LimitSituation::LimitReached { limit, downloaded } => format!(
            "The {} limit has been reached ({} downloaded). What next?",
            format_bytes(limit as f64),
            format_bytes(downloaded as f64)
        ),
    }
}

fn prompt_amount(choice: LimitChoice) -> Result<u64> {
    let prompt = match choice {
        LimitChoice::Extend => "Bytes to add (e.g. 500MB, 2GB)",
        _ => "Byte limit (e.g. 500MB, 2GB)",
    };
    let raw: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .validate_with(|input: &String| -> Result<(), String> {
            parse_byte_size(input)
                .map(|_| ())
                .map_err(|err| err.to_string())
        })
        .interact_text()?;
    parse_byte_size(&raw)
}

fn decision_for(choice: LimitChoice, amount: Option<u64>) -> LimitDecision {
    match (choice, amount) {
        (LimitChoice::KeepCurrent, _) => LimitDecision::ResumeAsIs,
        (LimitChoice::NewLimit, Some(bytes)) => LimitDecision::Replace(bytes),
        (LimitChoice::Extend, Some(bytes)) => LimitDecision::Extend(bytes),
        (LimitChoice::NewLimit | LimitChoice::Extend, None) => LimitDecision::ResumeAsIs,
        (LimitChoice::Unlimited, _) => LimitDecision::Unlimited,
        (LimitChoice::Abort, _) => LimitDecision::Abort,
    }
}
