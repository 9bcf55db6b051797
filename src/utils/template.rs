use crate::errors::{PipelineError, Result};
use chrono::{Duration, Local};
use regex::Regex;

/// Resolves a `{{ function_name(args) }}` call to its string value.
#[macro_export]
macro_rules! parse_function {
    ($func:expr) => {{
        let input = $func;
        if input == "current_date()" {
            Ok($crate::utils::template::current_date())
        } else if input.starts_with("few_date_ago(") && input.ends_with(")") {
            let arg_str = &input[13..input.len() - 1];
            let days: i64 = arg_str.parse().map_err(|_| {
                $crate::errors::PipelineError::ObservationError(format!(
                    "Invalid argument: {}",
                    arg_str
                ))
            })?;
            $crate::utils::template::few_date_ago(days)
        } else {
            Err($crate::errors::PipelineError::ObservationError(format!(
                "Unknown function: {}",
                input
            )))
        }
    }};
}

/// Extracts function names from template strings in the format `{{ function_name() }}`.
pub fn extract_function_names(text: &str) -> Result<Vec<String>> {
    let re = Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*\([^}]*\))\s*\}\}")?;
    let data = re
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .map(|data| data.as_str().to_string())
        .collect::<Vec<String>>();

    Ok(data)
}

pub fn current_date() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

pub fn few_date_ago(days: i64) -> Result<String> {
    if days < 0 {
        return Err(PipelineError::ObservationError(
            "days must be non-negative".to_string(),
        ));
    }

    let today = Local::now().date_naive();
    let Some(target) = today.checked_sub_signed(Duration::days(days)) else {
        return Err(PipelineError::ObservationError("date out of range".to_string()));
    };

    Ok(target.format("%Y-%m-%d").to_string())
}

/// Substitutes `{{ current_date() }}` / `{{ few_date_ago(n) }}` calls in
/// observation config values (query params, headers, SQL query text) with
/// their actual values.
pub fn substitute_templates(text: &str) -> Result<String> {
    let re = Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*\([^}]*\))\s*\}\}")?;

    let mut result = String::with_capacity(text.len());
    let mut last_match = 0;

    for cap in re.captures_iter(text) {
        let full_match = cap.get(0).unwrap();
        let function_name = cap.get(1).unwrap().as_str();

        result.push_str(&text[last_match..full_match.start()]);
        let replacement_value = parse_function!(function_name)?;
        result.push_str(&replacement_value);

        last_match = full_match.end();
    }

    result.push_str(&text[last_match..]);
    Ok(result)
}

/// Substitutes `${ENV_VAR}` references in config values (URLs, header values)
/// with the current process environment.
pub fn substitute_env_vars(text: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")?;
    let mut result = String::with_capacity(text.len());
    let mut last_match = 0;

    for cap in re.captures_iter(text) {
        let full_match = cap.get(0).unwrap();
        let var_name = cap.get(1).unwrap().as_str();
        let value = std::env::var(var_name).unwrap_or_default();

        result.push_str(&text[last_match..full_match.start()]);
        result.push_str(&value);
        last_match = full_match.end();
    }

    result.push_str(&text[last_match..]);
    Ok(result)
}
