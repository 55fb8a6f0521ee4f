//! Command palette grammar.
//!
//! Form fields and admin actions that need free text are driven from the
//! `:` palette. A command is a verb followed by its arguments; which view it
//! applies to is decided by the caller.

use atelier_core::{Quota, QuotaPeriod, QuotaType, UpscaleResolution};
use chrono::NaiveDate;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Prompt(String),
    Model(String),
    Aspect(String),
    Duration(u32),
    Samples(u32),
    Resolution(String),
    Audio(bool),
    Enhance(bool),
    FirstFrame(Option<String>),
    LastFrame(Option<String>),
    Project(Option<String>),
    Mode(ImageMode),
    Source(String),
    Filter(FilterCommand),
    Clip { start: f64, end: f64 },
    Dub(String),
    Upscale(UpscaleResolution),
    ShareGroup(String),
    ShareProject(String),
    Create(String),
    AddMembers(String),
    RemoveMembers(String),
    Import(String),
    Quota { quota: Quota, all: bool },
    Unrestricted(bool),
    Set { key: String, value: Value },
    Save,
    SavePrompt { text: String, keywords: String },
    Tags(Option<String>),
    AddVideo(String),
    Connect,
    Time(f64),
}

impl Command {
    /// The verb as typed.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Prompt(_) => "prompt",
            Command::Model(_) => "model",
            Command::Aspect(_) => "aspect",
            Command::Duration(_) => "duration",
            Command::Samples(_) => "samples",
            Command::Resolution(_) => "resolution",
            Command::Audio(_) => "audio",
            Command::Enhance(_) => "enhance",
            Command::FirstFrame(_) => "first-frame",
            Command::LastFrame(_) => "last-frame",
            Command::Project(_) => "project",
            Command::Mode(_) => "mode",
            Command::Source(_) => "source",
            Command::Filter(_) => "filter",
            Command::Clip { .. } => "clip",
            Command::Dub(_) => "dub",
            Command::Upscale(_) => "upscale",
            Command::ShareGroup(_) | Command::ShareProject(_) => "share",
            Command::Create(_) => "new",
            Command::AddMembers(_) | Command::RemoveMembers(_) => "members",
            Command::Import(_) => "import",
            Command::Quota { all: false, .. } => "quota",
            Command::Quota { all: true, .. } => "quota-all",
            Command::Unrestricted(_) => "unrestricted",
            Command::Set { .. } => "set",
            Command::Save => "save",
            Command::SavePrompt { .. } => "save-prompt",
            Command::Tags(_) => "tags",
            Command::AddVideo(_) => "add-video",
            Command::Connect => "connect",
            Command::Time(_) => "time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageMode {
    #[default]
    Generate,
    Enrich,
    Imitate,
}

impl ImageMode {
    pub fn title(&self) -> &'static str {
        match self {
            ImageMode::Generate => "Generate",
            ImageMode::Enrich => "Enrich",
            ImageMode::Imitate => "Imitate",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            ImageMode::Generate => ImageMode::Enrich,
            ImageMode::Enrich => ImageMode::Imitate,
            ImageMode::Imitate => ImageMode::Generate,
        }
    }

    /// Enrichment and imitation start from a local image.
    pub fn needs_source(&self) -> bool {
        !matches!(self, ImageMode::Generate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCommand {
    Status(Option<String>),
    Model(Option<String>),
    From(Option<NaiveDate>),
    To(Option<NaiveDate>),
    Edited(bool),
    Success(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("{command}: missing {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("{command}: {reason}")]
    InvalidArgument {
        command: &'static str,
        reason: String,
    },
}

pub fn parse(input: &str) -> Result<Command, CommandError> {
    let input = input.trim();
    let (verb, rest) = match input.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (input, ""),
    };
    if verb.is_empty() {
        return Err(CommandError::Empty);
    }

    let command = match verb.to_ascii_lowercase().as_str() {
        "prompt" => Command::Prompt(required("prompt", "text", rest)?.to_string()),
        "model" => Command::Model(required("model", "model id", rest)?.to_string()),
        "aspect" => Command::Aspect(required("aspect", "ratio", rest)?.to_string()),
        "duration" => Command::Duration(number("duration", rest)?),
        "samples" => Command::Samples(number("samples", rest)?),
        "resolution" => Command::Resolution(required("resolution", "value", rest)?.to_string()),
        "audio" => Command::Audio(switch("audio", rest)?),
        "enhance" => Command::Enhance(switch("enhance", rest)?),
        "first-frame" => Command::FirstFrame(clearable("first-frame", "gs:// uri", rest)?),
        "last-frame" => Command::LastFrame(clearable("last-frame", "gs:// uri", rest)?),
        "project" => Command::Project(clearable("project", "project id", rest)?),
        "mode" => Command::Mode(image_mode(rest)?),
        "source" => Command::Source(required("source", "path", rest)?.to_string()),
        "filter" => Command::Filter(filter(rest)?),
        "clip" => {
            let (start, end) = required("clip", "start and end", rest)?
                .split_once(char::is_whitespace)
                .ok_or(CommandError::MissingArgument {
                    command: "clip",
                    argument: "end",
                })?;
            Command::Clip {
                start: seconds("clip", start)?,
                end: seconds("clip", end.trim())?,
            }
        }
        "dub" => Command::Dub(required("dub", "text", rest)?.to_string()),
        "upscale" => Command::Upscale(match rest.to_ascii_lowercase().as_str() {
            "" | "1080p" => UpscaleResolution::FullHd,
            "4k" => UpscaleResolution::Uhd,
            other => {
                return Err(CommandError::InvalidArgument {
                    command: "upscale",
                    reason: format!("unknown resolution {}", other),
                })
            }
        }),
        "share" => {
            let (target, id) = required("share", "target", rest)?
                .split_once(char::is_whitespace)
                .ok_or(CommandError::MissingArgument {
                    command: "share",
                    argument: "id",
                })?;
            let id = id.trim().to_string();
            match target {
                "group" => Command::ShareGroup(id),
                "project" => Command::ShareProject(id),
                other => {
                    return Err(CommandError::InvalidArgument {
                        command: "share",
                        reason: format!("cannot share to {}", other),
                    })
                }
            }
        }
        "new" => Command::Create(required("new", "name", rest)?.to_string()),
        "members" => {
            let (op, emails) = required("members", "add or remove", rest)?
                .split_once(char::is_whitespace)
                .ok_or(CommandError::MissingArgument {
                    command: "members",
                    argument: "emails",
                })?;
            match op {
                "add" => Command::AddMembers(emails.trim().to_string()),
                "remove" => Command::RemoveMembers(emails.trim().to_string()),
                other => {
                    return Err(CommandError::InvalidArgument {
                        command: "members",
                        reason: format!("unknown operation {}", other),
                    })
                }
            }
        }
        "import" => Command::Import(required("import", "path", rest)?.to_string()),
        "quota" => Command::Quota {
            quota: quota("quota", rest)?,
            all: false,
        },
        "quota-all" => Command::Quota {
            quota: quota("quota-all", rest)?,
            all: true,
        },
        "unrestricted" => Command::Unrestricted(switch("unrestricted", rest)?),
        "set" => {
            let (key, value) = required("set", "key", rest)?
                .split_once(char::is_whitespace)
                .ok_or(CommandError::MissingArgument {
                    command: "set",
                    argument: "value",
                })?;
            let value = value.trim();
            // Bare words are taken as strings.
            let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
            Command::Set {
                key: key.to_string(),
                value,
            }
        }
        "save" => Command::Save,
        "save-prompt" => {
            let text = required("save-prompt", "text", rest)?;
            let (text, keywords) = match text.split_once('|') {
                Some((text, keywords)) => (text.trim(), keywords.trim()),
                None => (text, ""),
            };
            Command::SavePrompt {
                text: text.to_string(),
                keywords: keywords.to_string(),
            }
        }
        "tags" => Command::Tags(clearable("tags", "tags", rest)?),
        "add-video" => Command::AddVideo(required("add-video", "path or url", rest)?.to_string()),
        "connect" => Command::Connect,
        "time" => Command::Time(seconds("time", rest)?),
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(command)
}

fn required<'a>(
    command: &'static str,
    argument: &'static str,
    rest: &'a str,
) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        return Err(CommandError::MissingArgument { command, argument });
    }
    Ok(rest)
}

/// `none` or `clear` unsets the value.
fn clearable(
    command: &'static str,
    argument: &'static str,
    rest: &str,
) -> Result<Option<String>, CommandError> {
    let value = required(command, argument, rest)?;
    if value.eq_ignore_ascii_case("none") || value.eq_ignore_ascii_case("clear") {
        Ok(None)
    } else {
        Ok(Some(value.to_string()))
    }
}

fn number(command: &'static str, rest: &str) -> Result<u32, CommandError> {
    required(command, "number", rest)?
        .parse()
        .map_err(|_| CommandError::InvalidArgument {
            command,
            reason: format!("not a number: {}", rest),
        })
}

fn seconds(command: &'static str, raw: &str) -> Result<f64, CommandError> {
    let value: f64 = required(command, "seconds", raw)?
        .parse()
        .map_err(|_| CommandError::InvalidArgument {
            command,
            reason: format!("not a number of seconds: {}", raw),
        })?;
    if !value.is_finite() || value < 0.0 {
        return Err(CommandError::InvalidArgument {
            command,
            reason: "seconds must be zero or more".into(),
        });
    }
    Ok(value)
}

fn switch(command: &'static str, rest: &str) -> Result<bool, CommandError> {
    match required(command, "on or off", rest)?.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(CommandError::InvalidArgument {
            command,
            reason: format!("expected on or off, got {}", other),
        }),
    }
}

fn date(command: &'static str, raw: &str) -> Result<Option<NaiveDate>, CommandError> {
    if raw.eq_ignore_ascii_case("none") || raw.eq_ignore_ascii_case("clear") {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| CommandError::InvalidArgument {
            command,
            reason: format!("expected YYYY-MM-DD, got {}", raw),
        })
}

fn image_mode(rest: &str) -> Result<ImageMode, CommandError> {
    match required("mode", "generate, enrich or imitate", rest)?
        .to_ascii_lowercase()
        .as_str()
    {
        "generate" => Ok(ImageMode::Generate),
        "enrich" => Ok(ImageMode::Enrich),
        "imitate" => Ok(ImageMode::Imitate),
        other => Err(CommandError::InvalidArgument {
            command: "mode",
            reason: format!("unknown mode {}", other),
        }),
    }
}

fn filter(rest: &str) -> Result<FilterCommand, CommandError> {
    let rest = required("filter", "field", rest)?;
    let (field, value) = match rest.split_once(char::is_whitespace) {
        Some((field, value)) => (field, value.trim()),
        None => (rest, ""),
    };
    let text = |value: &str| {
        if value.is_empty() || value.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(value.to_string())
        }
    };
    match field {
        "status" => Ok(FilterCommand::Status(text(value))),
        "model" => Ok(FilterCommand::Model(text(value))),
        "from" => Ok(FilterCommand::From(date("filter", value)?)),
        "to" => Ok(FilterCommand::To(date("filter", value)?)),
        "edited" => Ok(FilterCommand::Edited(switch("filter", value)?)),
        "success" => Ok(FilterCommand::Success(switch("filter", value)?)),
        other => Err(CommandError::InvalidArgument {
            command: "filter",
            reason: format!("unknown filter {}", other),
        }),
    }
}

/// `none`, `cost <limit> <daily|weekly>` or `count <limit> <daily|weekly>`.
fn quota(command: &'static str, rest: &str) -> Result<Quota, CommandError> {
    let mut parts = required(command, "quota", rest)?.split_whitespace();
    let kind = match parts.next() {
        Some("none") => return Ok(Quota::default()),
        Some("cost") => QuotaType::CostLimit,
        Some("count") => QuotaType::GenerationQuantity,
        Some(other) => {
            return Err(CommandError::InvalidArgument {
                command,
                reason: format!("unknown quota type {}", other),
            })
        }
        None => {
            return Err(CommandError::MissingArgument {
                command,
                argument: "quota type",
            })
        }
    };
    let limit = parts
        .next()
        .ok_or(CommandError::MissingArgument {
            command,
            argument: "limit",
        })?
        .parse::<f64>()
        .map_err(|_| CommandError::InvalidArgument {
            command,
            reason: "limit must be a number".into(),
        })?;
    let period = match parts.next().unwrap_or("daily") {
        "daily" => QuotaPeriod::Daily,
        "weekly" => QuotaPeriod::Weekly,
        other => {
            return Err(CommandError::InvalidArgument {
                command,
                reason: format!("unknown period {}", other),
            })
        }
    };
    Ok(Quota {
        kind,
        limit: Some(limit),
        period,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_keeps_inner_whitespace() {
        assert_eq!(
            parse("prompt  a fox  at dawn ").unwrap(),
            Command::Prompt("a fox  at dawn".into())
        );
    }

    #[test]
    fn clip_needs_two_numbers() {
        assert_eq!(
            parse("clip 1.5 4").unwrap(),
            Command::Clip {
                start: 1.5,
                end: 4.0
            }
        );
        assert!(matches!(
            parse("clip 1.5"),
            Err(CommandError::MissingArgument { command: "clip", .. })
        ));
    }

    #[test]
    fn filter_dates_parse_and_clear() {
        assert_eq!(
            parse("filter from 2025-03-01").unwrap(),
            Command::Filter(FilterCommand::From(NaiveDate::from_ymd_opt(2025, 3, 1)))
        );
        assert_eq!(
            parse("filter to none").unwrap(),
            Command::Filter(FilterCommand::To(None))
        );
        assert!(parse("filter from 03/01/2025").is_err());
    }

    #[test]
    fn quota_defaults_to_daily() {
        let Command::Quota { quota, all } = parse("quota cost 50").unwrap() else {
            panic!("expected quota");
        };
        assert!(!all);
        assert_eq!(quota.kind, QuotaType::CostLimit);
        assert_eq!(quota.limit, Some(50.0));
        assert_eq!(quota.period, QuotaPeriod::Daily);
    }

    #[test]
    fn set_parses_json_or_falls_back_to_text() {
        assert_eq!(
            parse("set enable_upscale true").unwrap(),
            Command::Set {
                key: "enable_upscale".into(),
                value: Value::Bool(true)
            }
        );
        assert_eq!(
            parse("set banner Maintenance tonight").unwrap(),
            Command::Set {
                key: "banner".into(),
                value: Value::String("Maintenance tonight".into())
            }
        );
    }

    #[test]
    fn save_prompt_splits_keywords() {
        assert_eq!(
            parse("save-prompt a quiet harbor | sea, dawn").unwrap(),
            Command::SavePrompt {
                text: "a quiet harbor".into(),
                keywords: "sea, dawn".into()
            }
        );
    }

    #[test]
    fn unknown_verbs_are_reported() {
        assert_eq!(
            parse("launch"),
            Err(CommandError::Unknown("launch".into()))
        );
        assert_eq!(parse("   "), Err(CommandError::Empty));
    }
}
