//! Result rendering

use crate::error::CliError;
use pkgfetch_errors::{Error, UserFacingError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Serialize)]
struct PartFailureJson {
    code: Option<&'static str>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum FetchOutput<'a> {
    Ok {
        paths: &'a [PathBuf],
    },
    Failed {
        code: Option<&'static str>,
        message: String,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        parts: BTreeMap<&'a str, PartFailureJson>,
    },
}

fn render(output: &FetchOutput<'_>) -> Result<String, CliError> {
    serde_json::to_string_pretty(output).map_err(|e| CliError::Output(e.to_string()))
}

/// Print verified part paths, one per line or as JSON
pub fn print_paths(paths: &[PathBuf], json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", render(&FetchOutput::Ok { paths })?);
    } else {
        for path in paths {
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// Print a failed fetch as JSON on stdout
pub fn print_failure_json(error: &Error) -> Result<(), CliError> {
    println!("{}", render(&failure_output(error))?);
    Ok(())
}

fn failure_output(error: &Error) -> FetchOutput<'_> {
    let parts = error
        .part_failures()
        .map(|failures| {
            failures
                .iter()
                .map(|(name, e)| {
                    (
                        name,
                        PartFailureJson {
                            code: e.user_code(),
                            message: e.user_message().into_owned(),
                            hint: e.user_hint(),
                        },
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    FetchOutput::Failed {
        code: error.user_code(),
        message: error.user_message().into_owned(),
        parts,
    }
}
