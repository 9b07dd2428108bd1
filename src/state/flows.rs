//! Flow definitions
//!
//! Every multi-step conversation is declared here as data: an ordered set of
//! steps with explicit prev/next links, the expected input kind, a validator
//! and an optional terminal effect. Handlers interpret this table instead of
//! branching on flow names, so adding a flow means adding rows, not code
//! paths.

use std::collections::HashMap;
use std::sync::OnceLock;
use regex::Regex;
use serde_json::Value;

pub const FLOW_LOGIN: &str = "login";
pub const FLOW_REGISTRATION: &str = "registration";
pub const FLOW_RESET_PASSWORD: &str = "reset_password";
pub const FLOW_CREATE_LISTING: &str = "create_listing";

/// What kind of update a step consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Plain text answer
    Text,
    /// A shared location
    Location,
    /// One or more photos, finished with the Done control
    Photos,
}

/// Input validation rule attached to a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    MinLen(usize),
    Email,
    Phone,
    PositiveNumber,
    Password,
}

impl Validator {
    /// Validate raw text. Returns the normalized value to store, or the
    /// translation key of the error to show. Invalid input never advances
    /// the flow.
    pub fn validate(&self, input: &str) -> Result<Value, &'static str> {
        let input = input.trim();
        match self {
            Validator::MinLen(min) => {
                if input.len() >= *min {
                    Ok(Value::String(input.to_string()))
                } else {
                    Err("errors.too_short")
                }
            }
            Validator::Email => {
                if input.contains('@') && !input.contains(char::is_whitespace) && input.len() >= 5 {
                    Ok(Value::String(input.to_lowercase()))
                } else {
                    Err("errors.invalid_email")
                }
            }
            Validator::Phone => {
                let compact: String = input
                    .chars()
                    .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
                    .collect();
                if phone_regex().is_match(&compact) {
                    let normalized = if compact.starts_with('+') {
                        compact
                    } else {
                        format!("+{compact}")
                    };
                    Ok(Value::String(normalized))
                } else {
                    Err("errors.invalid_phone")
                }
            }
            Validator::PositiveNumber => match input.replace(',', ".").parse::<f64>() {
                Ok(n) if n > 0.0 && n.is_finite() => Ok(Value::from(n)),
                _ => Err("errors.invalid_number"),
            },
            Validator::Password => {
                if input.len() >= 6 {
                    Ok(Value::String(input.to_string()))
                } else {
                    Err("errors.password_too_short")
                }
            }
        }
    }
}

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?\d{7,15}$").unwrap())
}

/// Backend call fired when a step (or the whole flow) completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEffect {
    SubmitLogin,
    SubmitRegistration,
    VerifyAndLogin,
    RequestResetCode,
    SubmitPasswordReset,
    SubmitListing,
}

/// A single step of a flow
#[derive(Debug, Clone)]
pub struct FlowStep {
    /// Step identifier, unique within the flow
    pub id: &'static str,
    /// Translation key of the prompt shown for this step
    pub prompt_key: &'static str,
    /// Context data field the answer is stored under
    pub field: Option<&'static str>,
    /// Expected input kind
    pub input: InputKind,
    /// Validation applied to text input
    pub validator: Option<Validator>,
    /// Previous step, if stepping back is possible
    pub prev: Option<&'static str>,
    /// Next step; `None` with an effect means the flow ends there
    pub next: Option<&'static str>,
    /// Backend call fired when this step completes
    pub effect: Option<StepEffect>,
}

/// Static transition table for all flows
#[derive(Debug, Clone)]
pub struct FlowRegistry {
    steps: HashMap<(&'static str, &'static str), FlowStep>,
    first_steps: HashMap<&'static str, &'static str>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            steps: HashMap::new(),
            first_steps: HashMap::new(),
        };

        registry.define(
            FLOW_LOGIN,
            vec![
                FlowStep {
                    id: "email",
                    prompt_key: "flows.login.email",
                    field: Some("email"),
                    input: InputKind::Text,
                    validator: Some(Validator::Email),
                    prev: None,
                    next: Some("password"),
                    effect: None,
                },
                FlowStep {
                    id: "password",
                    prompt_key: "flows.login.password",
                    field: Some("password"),
                    input: InputKind::Text,
                    validator: Some(Validator::MinLen(1)),
                    prev: Some("email"),
                    next: None,
                    effect: Some(StepEffect::SubmitLogin),
                },
            ],
        );

        registry.define(
            FLOW_REGISTRATION,
            vec![
                FlowStep {
                    id: "first_name",
                    prompt_key: "flows.registration.first_name",
                    field: Some("first_name"),
                    input: InputKind::Text,
                    validator: Some(Validator::MinLen(2)),
                    prev: None,
                    next: Some("last_name"),
                    effect: None,
                },
                FlowStep {
                    id: "last_name",
                    prompt_key: "flows.registration.last_name",
                    field: Some("last_name"),
                    input: InputKind::Text,
                    validator: Some(Validator::MinLen(2)),
                    prev: Some("first_name"),
                    next: Some("email"),
                    effect: None,
                },
                FlowStep {
                    id: "email",
                    prompt_key: "flows.registration.email",
                    field: Some("email"),
                    input: InputKind::Text,
                    validator: Some(Validator::Email),
                    prev: Some("last_name"),
                    next: Some("phone"),
                    effect: None,
                },
                FlowStep {
                    id: "phone",
                    prompt_key: "flows.registration.phone",
                    field: Some("phone"),
                    input: InputKind::Text,
                    validator: Some(Validator::Phone),
                    prev: Some("email"),
                    next: Some("password"),
                    effect: None,
                },
                FlowStep {
                    id: "password",
                    prompt_key: "flows.registration.password",
                    field: Some("password"),
                    input: InputKind::Text,
                    validator: Some(Validator::Password),
                    prev: Some("phone"),
                    next: Some("code"),
                    effect: Some(StepEffect::SubmitRegistration),
                },
                FlowStep {
                    id: "code",
                    prompt_key: "flows.registration.code",
                    field: Some("code"),
                    input: InputKind::Text,
                    validator: Some(Validator::MinLen(1)),
                    // The account already exists remotely; going back to
                    // re-enter the password would desync, so the code step
                    // has no back edge.
                    prev: None,
                    next: None,
                    effect: Some(StepEffect::VerifyAndLogin),
                },
            ],
        );

        registry.define(
            FLOW_RESET_PASSWORD,
            vec![
                FlowStep {
                    id: "email",
                    prompt_key: "flows.reset_password.email",
                    field: Some("email"),
                    input: InputKind::Text,
                    validator: Some(Validator::Email),
                    prev: None,
                    next: Some("token"),
                    effect: Some(StepEffect::RequestResetCode),
                },
                FlowStep {
                    id: "token",
                    prompt_key: "flows.reset_password.token",
                    field: Some("token"),
                    input: InputKind::Text,
                    validator: Some(Validator::MinLen(1)),
                    prev: None,
                    next: Some("new_password"),
                    effect: None,
                },
                FlowStep {
                    id: "new_password",
                    prompt_key: "flows.reset_password.new_password",
                    field: Some("new_password"),
                    input: InputKind::Text,
                    validator: Some(Validator::Password),
                    prev: Some("token"),
                    next: None,
                    effect: Some(StepEffect::SubmitPasswordReset),
                },
            ],
        );

        registry.define(
            FLOW_CREATE_LISTING,
            vec![
                FlowStep {
                    id: "address",
                    prompt_key: "flows.create_listing.address",
                    field: Some("address"),
                    input: InputKind::Text,
                    validator: Some(Validator::MinLen(5)),
                    prev: None,
                    next: Some("apartment_number"),
                    effect: None,
                },
                FlowStep {
                    id: "apartment_number",
                    prompt_key: "flows.create_listing.apartment_number",
                    field: Some("apartment_number"),
                    input: InputKind::Text,
                    validator: Some(Validator::MinLen(1)),
                    prev: Some("address"),
                    next: Some("price"),
                    effect: None,
                },
                FlowStep {
                    id: "price",
                    prompt_key: "flows.create_listing.price",
                    field: Some("price"),
                    input: InputKind::Text,
                    validator: Some(Validator::PositiveNumber),
                    prev: Some("apartment_number"),
                    next: Some("area"),
                    effect: None,
                },
                FlowStep {
                    id: "area",
                    prompt_key: "flows.create_listing.area",
                    field: Some("area"),
                    input: InputKind::Text,
                    validator: Some(Validator::PositiveNumber),
                    prev: Some("price"),
                    next: Some("rooms"),
                    effect: None,
                },
                FlowStep {
                    id: "rooms",
                    prompt_key: "flows.create_listing.rooms",
                    field: Some("number_of_rooms"),
                    input: InputKind::Text,
                    validator: Some(Validator::PositiveNumber),
                    prev: Some("area"),
                    next: Some("description"),
                    effect: None,
                },
                FlowStep {
                    id: "description",
                    prompt_key: "flows.create_listing.description",
                    field: Some("description"),
                    input: InputKind::Text,
                    validator: Some(Validator::MinLen(5)),
                    prev: Some("rooms"),
                    next: Some("location"),
                    effect: None,
                },
                FlowStep {
                    id: "location",
                    prompt_key: "flows.create_listing.location",
                    field: None,
                    input: InputKind::Location,
                    validator: None,
                    prev: Some("description"),
                    next: Some("images"),
                    effect: None,
                },
                FlowStep {
                    id: "images",
                    prompt_key: "flows.create_listing.images",
                    field: Some("images"),
                    input: InputKind::Photos,
                    validator: None,
                    prev: Some("location"),
                    next: None,
                    effect: Some(StepEffect::SubmitListing),
                },
            ],
        );

        registry
    }

    fn define(&mut self, flow: &'static str, steps: Vec<FlowStep>) {
        if let Some(first) = steps.first() {
            self.first_steps.insert(flow, first.id);
        }
        for step in steps {
            self.steps.insert((flow, step.id), step);
        }
    }

    /// Look up a step by (flow, step) position
    pub fn step(&self, flow: &str, step_id: &str) -> Option<&FlowStep> {
        // Positions come back from Redis as owned strings
        self.steps
            .iter()
            .find(|((f, s), _)| *f == flow && *s == step_id)
            .map(|(_, step)| step)
    }

    /// First step of a flow
    pub fn first_step(&self, flow: &str) -> Option<&FlowStep> {
        let id = self.first_steps.iter().find(|(f, _)| **f == flow)?.1;
        self.step(flow, id)
    }
}

impl Default for FlowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_email_validator() {
        assert_eq!(Validator::Email.validate("User@Example.com"), Ok(json!("user@example.com")));
        assert_eq!(Validator::Email.validate("no-at-sign"), Err("errors.invalid_email"));
        assert_eq!(Validator::Email.validate("a b@c.d"), Err("errors.invalid_email"));
    }

    #[test]
    fn test_phone_validator_normalizes_plus() {
        assert_eq!(Validator::Phone.validate("+380 50 123 45 67"), Ok(json!("+380501234567")));
        assert_eq!(Validator::Phone.validate("380501234567"), Ok(json!("+380501234567")));
        assert_eq!(Validator::Phone.validate("12345"), Err("errors.invalid_phone"));
        assert_eq!(Validator::Phone.validate("not a phone"), Err("errors.invalid_phone"));
    }

    #[test]
    fn test_positive_number_validator() {
        assert_eq!(Validator::PositiveNumber.validate("12.5"), Ok(json!(12.5)));
        assert_eq!(Validator::PositiveNumber.validate("12,5"), Ok(json!(12.5)));
        assert_eq!(Validator::PositiveNumber.validate("0"), Err("errors.invalid_number"));
        assert_eq!(Validator::PositiveNumber.validate("-3"), Err("errors.invalid_number"));
        assert_eq!(Validator::PositiveNumber.validate("abc"), Err("errors.invalid_number"));
    }

    #[test]
    fn test_password_validator() {
        assert!(Validator::Password.validate("secret1").is_ok());
        assert_eq!(Validator::Password.validate("12345"), Err("errors.password_too_short"));
    }

    #[test]
    fn test_every_prev_and_next_edge_resolves() {
        let registry = FlowRegistry::new();
        for ((flow, _), step) in &registry.steps {
            if let Some(prev) = step.prev {
                assert!(registry.step(flow, prev).is_some(), "{flow}.{} prev dangling", step.id);
            }
            if let Some(next) = step.next {
                assert!(registry.step(flow, next).is_some(), "{flow}.{} next dangling", step.id);
            }
        }
    }

    #[test]
    fn test_terminal_steps_carry_effects() {
        let registry = FlowRegistry::new();
        for ((flow, _), step) in &registry.steps {
            if step.next.is_none() {
                assert!(step.effect.is_some(), "{flow}.{} terminal without effect", step.id);
            }
        }
    }

    #[test]
    fn test_registration_walkthrough() {
        let registry = FlowRegistry::new();
        let inputs = [
            ("Jane", "first_name"),
            ("Doe", "last_name"),
            ("Jane.Doe@Example.com", "email"),
            ("+380 50 123 45 67", "phone"),
            ("secret1", "password"),
            ("123456", "code"),
        ];

        let mut collected = HashMap::new();
        let mut step = registry.first_step(FLOW_REGISTRATION).unwrap();
        for (i, (input, expected_field)) in inputs.iter().enumerate() {
            assert_eq!(step.field, Some(*expected_field));
            let value = step.validator.unwrap().validate(input).unwrap();
            collected.insert(step.field.unwrap(), value);

            match step.next {
                Some(next) => step = registry.step(FLOW_REGISTRATION, next).unwrap(),
                None => assert_eq!(i, inputs.len() - 1),
            }
        }

        // The profile submit fires before the code step, verification at the end
        let password = registry.step(FLOW_REGISTRATION, "password").unwrap();
        assert_eq!(password.effect, Some(StepEffect::SubmitRegistration));
        let code = registry.step(FLOW_REGISTRATION, "code").unwrap();
        assert_eq!(code.effect, Some(StepEffect::VerifyAndLogin));

        assert_eq!(collected["email"], json!("jane.doe@example.com"));
        assert_eq!(collected["phone"], json!("+380501234567"));
        assert_eq!(collected.len(), 6);
    }

    #[test]
    fn test_first_steps() {
        let registry = FlowRegistry::new();
        assert_eq!(registry.first_step(FLOW_LOGIN).unwrap().id, "email");
        assert_eq!(registry.first_step(FLOW_CREATE_LISTING).unwrap().id, "address");
        assert!(registry.first_step("unknown").is_none());
    }
}
