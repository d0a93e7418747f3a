use kreg_derive::kreg_error;
use std::borrow::Cow;

#[kreg_error]
pub enum SampleError {
    #[error("Parse error{}: {source}", format_context(.context))]
    Parse { source: std::num::ParseIntError, context: Option<Cow<'static, str>> },

    #[error("Conflict{}: {message}", format_context(.context))]
    Conflict { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

#[test]
fn kreg_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/kreg_error_pass.rs");
}

#[test]
fn source_errors_convert_and_carry_context() {
    let err = "x1".parse::<u32>().context("reading priority").unwrap_err();
    assert!(matches!(err, SampleError::Parse { context: Some(_), .. }));
    assert!(err.to_string().starts_with("Parse error (reading priority): "));

    let plain: SampleError = "y".parse::<u32>().unwrap_err().into();
    assert!(plain.to_string().starts_with("Parse error: "));
}

#[test]
fn context_overrides_message_variants() {
    let result: Result<(), SampleError> =
        Err(SampleError::Conflict { message: "code INVOICE".into(), context: None });
    let err = result.context("pack finance").unwrap_err();
    assert_eq!(err.to_string(), "Conflict (pack finance): code INVOICE");
}

#[test]
fn internal_variant_accepts_strings() {
    let from_str: SampleError = "static failure".into();
    let from_string: SampleError = String::from("owned failure").into();
    assert_eq!(from_str.to_string(), "Internal error: static failure");
    assert_eq!(from_string.to_string(), "Internal error: owned failure");
}
