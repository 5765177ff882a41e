use std::sync::Arc;

use serde_json::json;
use sheet_notation::{
    NotationError, NotationProcessor, PcSheet, ProcessingContext, ProcessorConfig, SourceLocation,
    SystemDataLoader,
};

fn processor() -> NotationProcessor {
    NotationProcessor::with_config(
        Arc::new(SystemDataLoader::empty()),
        ProcessorConfig::default().with_seed(3),
    )
}

fn ctx() -> ProcessingContext {
    ProcessingContext::new(json!({"name": "Ona", "skills": {"brawl": 2}, "tags": ["a"]}))
}

// Strict mode: every failure aborts with its own category.
#[test]
fn strict_errors_keep_their_category() {
    let p = processor();
    let c = ctx();
    assert!(matches!(
        p.process("{{VALUE:skills.nope}}", &c).unwrap_err(),
        NotationError::Reference { .. }
    ));
    assert!(matches!(
        p.process("{{CALC:2 +* 3}}", &c).unwrap_err(),
        NotationError::Syntax(_)
    ));
    assert!(matches!(
        p.process("{{NOPE:x}}", &c).unwrap_err(),
        NotationError::UnsupportedNotation(_)
    ));
    assert!(matches!(
        p.process("{{MAX:name}}", &c).unwrap_err(),
        NotationError::Handler { .. }
    ));
    assert!(matches!(
        p.process("{{TOOLTIP:x,<script>y</script>}}", &c).unwrap_err(),
        NotationError::Markup(_)
    ));
    assert!(matches!(
        p.process("{{SOURCE:XYZ/12}}", &c).unwrap_err(),
        NotationError::Handler { .. }
    ));
}

// Lenient mode downgrades recoverable errors but never an unterminated span.
#[test]
fn lenient_mode_limits() {
    let p = processor();
    let c = ctx()
        .with_strict(false)
        .with_location(SourceLocation::new("sheet.html", 1));
    let out = p
        .process("<p>{{VALUE:skills.nope}} and {{NOPE:x}}</p>", &c)
        .unwrap();
    assert_eq!(out.matches("class='inline-error'").count(), 2);
    assert!(out.contains("Location: sheet.html:1"));

    assert!(matches!(
        p.process("<p>{{VALUE:skills.brawl</p>", &c).unwrap_err(),
        NotationError::Unterminated { .. }
    ));
}

#[test]
fn wrong_argument_counts() {
    let p = processor();
    let c = ctx();
    for template in ["{{NAMEVALUE:a,b}}", "{{IFTRUE:x}}", "{{SWITCH:x,y}}", "{{VALUE:a,b,c,d,e}}"] {
        let err = p.process(template, &c).unwrap_err();
        assert!(
            matches!(err, NotationError::Handler { .. }),
            "{template}: {err}"
        );
    }
}

#[test]
fn broken_rule_data_aborts_the_sheet_even_when_lenient() {
    let loader = Arc::new(SystemDataLoader::from_definitions([(
        "merits",
        json!({
            "twin": {
                "effect": "x",
                "deviations": {
                    "A": {"replace": {"effect": "a"}},
                    "B": {"replace": {"effect": "b"}}
                }
            },
            "odd": {"effect": "x", "deviations": {"Bad": {"regexpReplace": [["(", "y"]]}}}
        }),
    )]));
    let lenient = ProcessorConfig::default().with_strict(false).with_seed(1);

    let sheet = PcSheet::with_config(
        json!({"merits": [{"key": "twin", "deviations": ["A", "B"]}]}),
        loader.clone(),
        lenient.clone(),
    );
    assert!(matches!(
        sheet.build_context().unwrap_err(),
        NotationError::Conflict { .. }
    ));

    let sheet = PcSheet::with_config(
        json!({"merits": [{"key": "odd", "deviations": ["Bad"]}]}),
        loader,
        lenient,
    );
    assert!(matches!(
        sheet.build_context().unwrap_err(),
        NotationError::RuleData(_)
    ));
}

#[test]
fn runaway_templates_hit_the_expansion_cap() {
    let p = NotationProcessor::with_config(
        Arc::new(SystemDataLoader::empty()),
        ProcessorConfig::default().with_max_expansions(10),
    );
    let c = ctx().with_vars(json!({"again": "{{REF:vars.again}}"}));
    assert!(p.process("{{REF:vars.again}}", &c).is_err());
}
