//! Unit tests for error handling.
//!
//! This module contains tests for error types, classification and the info log.

use crate::errors::errors::{Error, ErrorClass, ErrorImpl, ErrorTip, InfoLog};
use crate::Position;
use std::rc::Rc;

fn at(offset: u32) -> Option<Position> {
    Some(Position(offset, Rc::new("test.frag".to_string())))
}

#[test]
fn test_error_creation() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "@".to_string(),
        },
        at(10),
    );

    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(error.get_error_class(), ErrorClass::Syntax);
}

#[test]
fn test_error_position() {
    let error = Error::new(
        ErrorImpl::UnexpectedToken {
            token: "identifier".to_string(),
        },
        at(42),
    );

    assert_eq!(error.get_position().unwrap().0, 42);
}

#[test]
fn test_error_without_position_takes_one_later() {
    let error = Error::new(ErrorImpl::NotAnLvalue, None);
    assert!(error.get_position().is_none());

    let position = Position(7, Rc::new("test.frag".to_string()));
    let error = error.or_position(Some(&position));
    assert_eq!(error.get_position().unwrap().0, 7);

    let other = Position(99, Rc::new("test.frag".to_string()));
    let error = error.or_position(Some(&other));
    assert_eq!(error.get_position().unwrap().0, 7);
}

#[test]
fn test_error_classes() {
    let lookup = Error::new(
        ErrorImpl::VariableNotDeclared {
            variable: "x".to_string(),
        },
        None,
    );
    let type_error = Error::new(
        ErrorImpl::InvalidWriteMask {
            swizzle: "xx".to_string(),
        },
        None,
    );
    let resource = Error::new(
        ErrorImpl::RegisterFileExhausted {
            file: "TEMP".to_string(),
            size: 4,
        },
        None,
    );
    let control = Error::new(ErrorImpl::ContinueOutsideLoop, None);

    assert_eq!(lookup.get_error_class(), ErrorClass::Lookup);
    assert_eq!(type_error.get_error_class(), ErrorClass::Type);
    assert_eq!(resource.get_error_class(), ErrorClass::Resource);
    assert_eq!(control.get_error_class(), ErrorClass::Control);
}

#[test]
fn test_error_tip_suggestion() {
    let error = Error::new(
        ErrorImpl::TypeMatchError {
            expected: "float".to_string(),
            received: "int".to_string(),
        },
        None,
    );

    match error.get_tip() {
        ErrorTip::Suggestion(message) => {
            assert_eq!(message, "Expected type `float`, received `int`")
        }
        ErrorTip::None => panic!("Expected a suggestion"),
    }
}

#[test]
fn test_error_tip_none() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "@".to_string(),
        },
        None,
    );

    assert!(matches!(error.get_tip(), ErrorTip::None));
    assert_eq!(format!("{}", error.get_tip()), "");
}

#[test]
fn test_error_display_includes_position() {
    let error = Error::new(ErrorImpl::BreakOutsideLoop, at(3));

    assert_eq!(format!("{}", error), "test.frag:3: 'break' not in loop");
}

#[test]
fn test_info_log_keeps_first_error() {
    let mut log = InfoLog::new();

    log.record(Error::new(ErrorImpl::BreakOutsideLoop, None));
    log.record(Error::new(ErrorImpl::ContinueOutsideLoop, None));

    assert_eq!(log.error().unwrap().get_error_name(), "BreakOutsideLoop");
    assert_eq!(log.text(), "error: 'break' not in loop\n");
}

#[test]
fn test_info_log_warnings_then_clear() {
    let mut log = InfoLog::new();

    log.warning("call adapted".to_string());
    log.record(Error::new(ErrorImpl::NotAnLvalue, None));

    assert_eq!(log.warnings().len(), 1);
    assert!(log.text().starts_with("warning: call adapted\n"));

    log.clear();
    assert!(log.error().is_none());
    assert!(log.text().is_empty());
}
