//! Property-based tests for the Puppetfile model.
//!
//! These tests use proptest to verify the rendering and mutation
//! invariants hold across randomly generated pin files.

use proptest::prelude::*;

use rispuppet::core::pinfile::{PinFile, Section};
use rispuppet::core::types::ModuleId;

/// Strategy for module name parts (`[A-Za-z0-9_]+`).
fn name_part() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,12}"
}

/// Internal names, biased towards the role and profile prefixes.
fn internal_name() -> impl Strategy<Value = String> {
    prop_oneof![
        name_part().prop_map(|n| format!("risrole_{n}")),
        name_part().prop_map(|n| format!("risprof_{n}")),
        name_part(),
    ]
}

fn module_id() -> impl Strategy<Value = ModuleId> {
    prop_oneof![
        internal_name().prop_map(|n| ModuleId::new(n).unwrap()),
        (name_part(), name_part()).prop_map(|(ns, n)| ModuleId::external(&ns, &n).unwrap()),
    ]
}

fn reference() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop_oneof![
        "v[0-9]\\.[0-9]{1,2}\\.[0-9]",
        "[0-9a-f]{40}",
        "[a-z][a-z0-9_/-]{0,16}",
    ])
}

/// Pin file text built from random declarations, with noise lines.
fn pinfile_text() -> impl Strategy<Value = String> {
    prop::collection::vec((module_id(), reference(), any::<bool>()), 0..20).prop_map(|decls| {
        let mut text = String::from("# header comment\n");
        for (id, reference, noise) in decls {
            let keyword = if id.is_external() { "ris_ext" } else { "ris_int" };
            let names = match id.namespace() {
                Some(ns) => format!("'{}', '{}'", ns, id.name()),
                None => format!("'{}'", id.name()),
            };
            match reference {
                Some(r) => text.push_str(&format!("{keyword} {names}, :ref => '{r}'\n")),
                None => text.push_str(&format!("{keyword} {names}\n")),
            }
            if noise {
                text.push_str("mod 'unmanaged', :git => 'x'\n\n");
            }
        }
        text
    })
}

proptest! {
    #[test]
    fn render_is_stable_after_one_round_trip(text in pinfile_text()) {
        let once = PinFile::parse(&text).render();
        let twice = PinFile::parse(&once).render();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn set_is_idempotent(text in pinfile_text(), id in module_id(), r in reference()) {
        let mut once = PinFile::parse(&text);
        once.set_module(&id, r.as_deref());
        let mut twice = once.clone();
        twice.set_module(&id, r.as_deref());
        prop_assert_eq!(once.render(), twice.render());
    }

    #[test]
    fn set_then_read_back(text in pinfile_text(), id in module_id(), r in reference()) {
        let mut file = PinFile::parse(&text);
        file.set_module(&id, r.as_deref());
        let reparsed = PinFile::parse(&file.render());
        prop_assert!(reparsed.contains(&id));
        prop_assert_eq!(reparsed.pinned_ref(&id), r.as_deref());
    }

    #[test]
    fn unset_after_set_of_new_module_restores(text in pinfile_text(), id in module_id(), r in reference()) {
        let original = PinFile::parse(&text);
        prop_assume!(!original.contains(&id));
        let mut file = original.clone();
        file.set_module(&id, r.as_deref());
        file.unset_module(&id);
        prop_assert_eq!(file.render(), original.render());
    }

    #[test]
    fn every_declaration_lands_in_its_section(text in pinfile_text()) {
        let file = PinFile::parse(&text);
        let rendered = file.render();
        for decl in file.declarations() {
            let title = format!("# {}\n", Section::of(&decl.id).title());
            let section_start = rendered.find(&title).unwrap();
            let needle = match decl.id.namespace() {
                Some(ns) => format!("'{}', '{}'", ns, decl.id.name()),
                None => format!("'{}'", decl.id.name()),
            };
            let position = rendered[section_start..].find(&needle);
            prop_assert!(position.is_some(), "{} missing from {:?}", decl.id, title);
        }
    }
}
