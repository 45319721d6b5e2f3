//! Idempotence and no-op preservation of the built-in rule set.

use api_rewriter::{webgpu_rules, LengthStyle};
use proptest::prelude::*;

/// Source lines that exercise the descriptor, boolean, and enum rules.
fn rewrite_target() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(|s| format!("    desc.label = \"{s}\";")),
        "[a-z ]{0,12}".prop_map(|s| format!("\tstate.entryPoint = \"{s}\";")),
        "[a-z]{1,6}".prop_map(|s| format!("wgsl.code = {s}.c_str();")),
        Just("x = WGPU_TRUE;".to_string()),
        Just("y = WGPU_FALSE;".to_string()),
        Just("ms.alphaToCoverageEnabled = true;".to_string()),
        Just("prim.unclippedDepth = false;".to_string()),
        Just("c.sType = WGPUSType_ShaderModuleWGSLDescriptor;".to_string()),
    ]
}

/// Chain pointers, includes, and filler.
fn surrounding() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("d.nextInChain = &wgsl.chain;".to_string()),
        Just("d.nextInChain = reinterpret_cast<WGPUChainedStruct*>(&wgsl);".to_string()),
        Just("size_t n = strlen(name);".to_string()),
        Just("#include <webgpu/webgpu.h>".to_string()),
        Just("#include <cstring>".to_string()),
        "[a-zA-Z0-9_ ;=(){}]{0,24}",
    ]
}

fn fragment() -> impl Strategy<Value = String> {
    prop_oneof![rewrite_target(), surrounding()]
}

fn source() -> impl Strategy<Value = String> {
    prop::collection::vec(fragment(), 0..16).prop_map(|lines| lines.join("\n"))
}

/// Text built only from characters that cannot start any rule's match.
fn inert_source() -> impl Strategy<Value = String> {
    "[0-9 +*/%;\n(){}<>-]{0,200}"
}

proptest! {
    #[test]
    fn rule_set_is_idempotent(text in source()) {
        for style in [LengthStyle::Literal, LengthStyle::Strlen] {
            let rules = webgpu_rules(style);
            let once = rules.apply(&text);
            let twice = rules.apply(&once.text);
            prop_assert_eq!(&twice.text, &once.text);
            prop_assert!(!twice.changed());
        }
    }

    #[test]
    fn text_without_targets_is_preserved(text in inert_source()) {
        let rewrite = webgpu_rules(LengthStyle::Literal).apply(&text);
        prop_assert_eq!(&rewrite.text, &text);
        prop_assert!(!rewrite.changed());
    }

    #[test]
    fn cstring_include_never_duplicated(text in source()) {
        let out = webgpu_rules(LengthStyle::Strlen).apply(&text).text;
        let count = out.lines().filter(|l| l.trim() == "#include <cstring>").count();
        let before = text.lines().filter(|l| l.trim() == "#include <cstring>").count();
        prop_assert!(count <= before.max(1));
    }
}
