//! Mockito verification modes.

use crate::errors::RectifyError;
use crate::refaster::{ImportPolicy, TemplateRule};

pub(super) fn rules() -> Result<Vec<TemplateRule>, RectifyError> {
    Ok(vec![
        TemplateRule::builder("MockitoRules.Never")
            .summary("Prefer `never()` over explicitly expecting zero invocations")
            .import("static org.mockito.Mockito.never")
            .import("static org.mockito.Mockito.times")
            .before("times(0)")
            .after("never()")
            .policy(ImportPolicy::StaticImportAlways)
            .build()?,
        TemplateRule::builder("MockitoRules.VerifyOnce")
            .summary("Prefer `verify(mock)` over explicitly expecting a single invocation")
            .import("static org.mockito.Mockito.times")
            .import("static org.mockito.Mockito.verify")
            .placeholder("mock")
            .before("verify(mock, times(1))")
            .after("verify(mock)")
            .policy(ImportPolicy::StaticImportAlways)
            .build()?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refaster::testing::rewrite;

    #[test]
    fn simplifies_verification_modes() {
        let rules = rules().unwrap();
        let source = "import static org.mockito.Mockito.times;\nimport static org.mockito.Mockito.verify;\n\nimport org.mockito.Mockito;\n\nclass A {\n  void m(Runnable r) {\n    verify(r, times(1)).run();\n    Mockito.verify(r, Mockito.times(0)).run();\n    verify(r, times(2)).run();\n  }\n}\n";

        let (diagnostics, output) = rewrite(&rules[1], source);
        assert_eq!(diagnostics.len(), 1);
        assert!(output.contains("    verify(r).run();\n"), "{output}");

        let (diagnostics, output) = rewrite(&rules[0], source);
        assert_eq!(diagnostics.len(), 1);
        assert!(
            output.starts_with("import static org.mockito.Mockito.never;\nimport static org.mockito.Mockito.times;\n"),
            "{output}"
        );
        assert!(output.contains("Mockito.verify(r, never()).run();"), "{output}");
    }
}
