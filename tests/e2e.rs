use std::fs;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sheet_notation as sn;
use sn::{PcSheet, ProcessorConfig, SystemDataLoader};
use tempfile::TempDir;

fn data_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let write = |name: &str, v: Value| fs::write(dir.path().join(name), v.to_string()).unwrap();
    write(
        "attributes.json",
        json!({
            "strength": {"name": "Strength"},
            "dexterity": {"name": "Dexterity"},
            "wits": {"name": "Wits"},
            "stamina": {"name": "Stamina"}
        }),
    );
    write(
        "skills.json",
        json!({"brawl": {"name": "Brawl", "source": "CofD/69"}}),
    );
    write(
        "merits.json",
        json!({
            "fast-reflexes": {
                "name": "Fast Reflexes",
                "effect": {
                    "1": "+1 Initiative.",
                    "2": "+2 Initiative; {{IFTRUE:this.fighter,'trained fighter','untrained'}}."
                },
                "source": {"book": "CofD", "page": 44},
                "deviations": {"Lightning": {"magMod": 1, "regexpReplace": [["Initiative", "Initiative and Speed"]]}}
            }
        }),
    );
    write(
        "scars.json",
        json!({
            "iron-hide": {
                "name": "Iron Hide",
                "type": "physical",
                "activation": "persistent",
                "effect": "Soak {{VALUE:this.adjustedValue}}; {{NAMEVALUE:this.stats.scarResistance}}."
            }
        }),
    );
    dir
}

fn character() -> Value {
    json!({
        "name": "Mara",
        "sex": "female",
        "attributes": {
            "strength": {"value": {"base": 3, "total": 3}},
            "dexterity": 2,
            "wits": 3,
            "stamina": {"value": {"base": 2, "bonus": 1, "total": 3}}
        },
        "skills": {"brawl": {"value": {"base": 2}}},
        "derived": {"health": 8, "armor": {"general": 1, "ballistic": 2}},
        "merits": [{"key": "fast-reflexes", "value": 2, "fighter": true, "deviations": ["Lightning"]}],
        "scars": {"iron-hide": {"value": 2}}
    })
}

#[test]
fn renders_a_full_sheet_from_files() {
    let dir = data_dir();
    let loader = Arc::new(SystemDataLoader::new(dir.path()));
    let sheet = PcSheet::with_config(character(), loader, ProcessorConfig::default().with_seed(11));

    let html = sheet
        .render(
            "<h1>{{NAME}}</h1><p>{{NAMEVALUE:dex}}, {{NAMEVALUE:wits}}, {{NAMEVALUE:armor}}. {{He}} has {{VALUE:health}} health.</p>",
            None,
        )
        .unwrap();
    assert_eq!(
        html,
        "<h1>Mara</h1><p><strong>Dexterity (+2)</strong>, <strong>Wits (+3)</strong>, <strong>Armor (1/2)</strong>. She has 8 health.</p>"
    );

    let merit = sheet
        .render("<p>{{REF:merits.fast-reflexes.effect}}</p>", None)
        .unwrap();
    assert_eq!(merit, "<p>+2 Initiative and Speed; trained fighter.</p>");

    let built = sheet.build_context().unwrap();
    let record = &built["merits"][0];
    assert_eq!(record["adjustedValue"], json!(3));
    assert_eq!(record["appliedDeviations"], json!(["Lightning"]));
    assert_eq!(
        record["citation"],
        json!("<span class='citation'><em>Chronicles of Darkness</em>, p. 44</span>")
    );
    let scar = &built["scars"][0];
    assert_eq!(scar["effect"], json!("Soak 2; <strong>Stamina (+2)</strong>."));
    assert_eq!(scar["badges"], json!("<span class='badge badge-persistent'>Persistent</span>"));
    assert!(built["attributes"]["stamina"]["dotline"].as_str().unwrap().contains("dot-bonus"));
}

#[test]
fn convenience_render_reads_the_data_dir() {
    let dir = data_dir();
    let html = sn::render(
        character(),
        "<p>{{SOURCE:json.skills.brawl.source}}</p>",
        dir.path(),
        ProcessorConfig::default().with_seed(1),
    )
    .unwrap();
    assert_eq!(
        html,
        "<p><span class='citation'><em>Chronicles of Darkness</em>, p. 69</span></p>"
    );
}

#[test]
fn conditionals_on_rated_traits_loaded_from_files() {
    let dir = data_dir();
    let template = "<p>{{IFTRUE:skills.brawl,trained,untrained}} / {{SWITCH:dex,2,two,other}}</p>";
    let render = |character: Value| {
        sn::render(character, template, dir.path(), ProcessorConfig::default().with_seed(3)).unwrap()
    };
    assert_eq!(render(character()), "<p>trained / two</p>");

    let mut novice = character();
    novice["skills"]["brawl"] = json!(0);
    novice["attributes"]["dexterity"] = json!(1);
    assert_eq!(render(novice), "<p>untrained / other</p>");
}

#[test]
fn tooltips_are_substituted_once_per_document() {
    let dir = data_dir();
    let loader = Arc::new(SystemDataLoader::new(dir.path()));
    let sheet = PcSheet::with_config(character(), loader, ProcessorConfig::default().with_seed(5));
    let html = sheet
        .render(
            "<p>{{TOOLTIP:Brawl,Rolls {{VALUE:skills.brawl}} dice}} and {{TOOLTIP:.hint,Wits,{{NAMEVALUE:wits}}}}</p>",
            None,
        )
        .unwrap();
    assert!(!html.contains("@@TT:"), "{html}");
    assert_eq!(html.matches("class='tooltip-content'").count(), 2);
    assert!(html.contains("Rolls 2 dice"));
    assert!(html.contains("tooltip-anchor hint"));

    let again = PcSheet::with_config(
        character(),
        Arc::new(SystemDataLoader::new(dir.path())),
        ProcessorConfig::default().with_seed(5),
    )
    .render(
        "<p>{{TOOLTIP:Brawl,Rolls {{VALUE:skills.brawl}} dice}} and {{TOOLTIP:.hint,Wits,{{NAMEVALUE:wits}}}}</p>",
        None,
    )
    .unwrap();
    assert_eq!(html, again);
}

#[test]
fn missing_data_dir_still_renders_character_values() {
    let html = sn::render(
        character(),
        "<p>{{VALUE:str}} / {{CALC:str + wits}}</p>",
        "/no/such/dir",
        ProcessorConfig::default().with_seed(2),
    );
    // Scars and merits need their rule data for effect text.
    assert!(matches!(html, Err(sn::NotationError::RuleData(_))));

    let mut plain = character();
    plain["merits"] = json!([]);
    plain["scars"] = json!([]);
    let html = sn::render(
        plain,
        "<p>{{VALUE:str}} / {{CALC:str + wits}}</p>",
        "/no/such/dir",
        ProcessorConfig::default().with_seed(2),
    )
    .unwrap();
    assert_eq!(html, "<p>3 / 6</p>");
}
