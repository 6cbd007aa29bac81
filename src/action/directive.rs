use crate::reply::{EnhancedCode, SmtpError, parse_enhanced_code};

use super::{DirectiveError, FailAction};

pub(crate) const DEFAULT_CODE: u16 = 554;
pub(crate) const DEFAULT_ENHANCED_CODE: EnhancedCode = EnhancedCode(5, 7, 0);
pub(crate) const DEFAULT_MESSAGE: &str = "Message rejected due to a local policy";
pub(crate) const REJECT_DIRECTIVE_REASON: &str = "reject directive used";

/// Parses `reject|quarantine [code [enhanced-code [message]]]` or `ignore`.
pub fn parse_action_directive<S: AsRef<str>>(args: &[S]) -> Result<FailAction, DirectiveError> {
    let Some((action, rest)) = args.split_first() else {
        return Err(DirectiveError::NoArguments);
    };

    match action.as_ref() {
        "reject" | "quarantine" => {
            let reason_override = if rest.is_empty() {
                None
            } else {
                Some(parse_reject_directive(rest)?)
            };
            let reject = action.as_ref() == "reject";
            Ok(FailAction {
                quarantine: !reject,
                reject,
                reason_override,
            })
        }
        "ignore" => {
            if !rest.is_empty() {
                return Err(DirectiveError::UnexpectedArguments {
                    action: "ignore".to_string(),
                    count: rest.len(),
                });
            }
            Ok(FailAction::ignore())
        }
        other => Err(DirectiveError::InvalidAction(other.to_string())),
    }
}

/// Builds the SMTP reply configured by `[code [enhanced-code [message]]]`.
///
/// Arguments are positional: supplying one requires every argument before it
/// to be valid as well. Missing trailing arguments fall back to
/// `554 5.7.0 Message rejected due to a local policy`.
pub fn parse_reject_directive<S: AsRef<str>>(args: &[S]) -> Result<SmtpError, DirectiveError> {
    if args.len() > 3 {
        return Err(DirectiveError::ArgCount(args.len()));
    }

    let mut code = DEFAULT_CODE;
    let mut enhanced_code = DEFAULT_ENHANCED_CODE;
    let mut message = DEFAULT_MESSAGE;

    if let Some(raw) = args.first() {
        code = parse_code(raw.as_ref())?;
    }

    if let Some(raw) = args.get(1) {
        enhanced_code = parse_enhanced_code(raw.as_ref()).map_err(DirectiveError::format)?;
        if !matches!(enhanced_code.class(), 4 | 5) {
            return Err(DirectiveError::InvalidEnhancedCode {
                code: enhanced_code,
            });
        }
        if enhanced_code.class() != code / 100 {
            tracing::warn!(
                code,
                enhanced_code = %enhanced_code,
                "reply code and enhanced code classes differ"
            );
        }
    }

    if let Some(raw) = args.get(2) {
        message = raw.as_ref();
        if message.is_empty() {
            return Err(DirectiveError::EmptyMessage);
        }
    }

    Ok(SmtpError::new(code, enhanced_code, message).with_reason(REJECT_DIRECTIVE_REASON))
}

fn parse_code(raw: &str) -> Result<u16, DirectiveError> {
    let code: u16 = raw
        .parse()
        .map_err(|_| DirectiveError::invalid_code(raw))?;
    if !matches!(code / 100, 4 | 5) {
        return Err(DirectiveError::invalid_code(raw));
    }
    Ok(code)
}
