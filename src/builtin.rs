//! Built-in rule set migrating WebGPU C API call sites to the string-view
//! revision of `webgpu.h`.
//!
//! Rules run in the order listed by [`webgpu_rules`]. The include rule comes
//! last because the `strlen` length style emits calls that need it.

use crate::rule::{DescriptorSource, DescriptorSpec, LengthStyle, Rule, RuleSet};
use regex::Regex;

/// Descriptor type introduced by the newer header.
pub const STRING_VIEW_TYPE: &str = "WGPUStringView";

/// Numeric value of the removed `WGPUSType_ShaderModuleWGSLDescriptor`.
pub const WGSL_STYPE_CAST: &str = "(WGPUSType)0x00040006";

/// Identifier or dotted member path (`desc`, `pipelineDesc.fragment`).
const OBJECT_PATH: &str = r"[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*";

/// Boolean fields whose type changed from `bool` to an integer boolean.
const INT_BOOL_FIELDS: &str = "alphaToCoverageEnabled|unclippedDepth";

fn pattern(src: &str) -> Regex {
    Regex::new(src).expect("built-in rule patterns are valid")
}

/// `<obj>.<field> = "<text>";` alone on its line.
fn literal_assignment(field: &str) -> Regex {
    pattern(&format!(
        r#"(?m)^(?P<indent>[ \t]*)(?P<obj>{OBJECT_PATH})\.{field}[ \t]*=[ \t]*"(?P<text>(?:[^"\\\n]|\\.)*)"[ \t]*;"#
    ))
}

fn string_view(field: &str, suffix: &str, source: DescriptorSource) -> DescriptorSpec {
    DescriptorSpec {
        type_name: STRING_VIEW_TYPE.to_string(),
        field: field.to_string(),
        suffix: suffix.to_string(),
        source,
    }
}

/// The full WebGPU migration, in application order.
pub fn webgpu_rules(length: LengthStyle) -> RuleSet {
    let mut rules = RuleSet::new();

    rules.push(Rule::descriptor(
        "label-string-view",
        "`x.label = \"text\";` becomes a WGPUStringView descriptor assignment",
        literal_assignment("label"),
        string_view("label", "Label", DescriptorSource::Literal(length)),
    ));

    rules.push(Rule::descriptor(
        "entry-point-string-view",
        "`x.entryPoint = \"main\";` becomes a WGPUStringView descriptor assignment",
        literal_assignment("entryPoint"),
        string_view("entryPoint", "EntryPoint", DescriptorSource::Literal(length)),
    ));

    rules.push(Rule::descriptor(
        "code-string-view",
        "`x.code = src.c_str();` becomes a WGPUStringView over src with src.length()",
        pattern(&format!(
            r"(?m)^(?P<indent>[ \t]*)(?P<obj>{OBJECT_PATH})\.code[ \t]*=[ \t]*(?P<src>[A-Za-z_]\w*)\.(?P<ptr>c_str|data)\(\)[ \t]*;"
        )),
        string_view("code", "Code", DescriptorSource::Buffer),
    ));

    rules.push(Rule::substitute(
        "bool-sentinel-true",
        "WGPU_TRUE becomes 1",
        pattern(r"\bWGPU_TRUE\b"),
        "1",
    ));

    rules.push(Rule::substitute(
        "bool-sentinel-false",
        "WGPU_FALSE becomes 0",
        pattern(r"\bWGPU_FALSE\b"),
        "0",
    ));

    rules.push(Rule::substitute(
        "bool-field-true",
        "`true` assigned to alphaToCoverageEnabled or unclippedDepth becomes 1",
        pattern(&format!(
            r"\.(?P<field>{INT_BOOL_FIELDS})(?P<eq>[ \t]*=[ \t]*)true\b"
        )),
        ".${field}${eq}1",
    ));

    rules.push(Rule::substitute(
        "bool-field-false",
        "`false` assigned to alphaToCoverageEnabled or unclippedDepth becomes 0",
        pattern(&format!(
            r"\.(?P<field>{INT_BOOL_FIELDS})(?P<eq>[ \t]*=[ \t]*)false\b"
        )),
        ".${field}${eq}0",
    ));

    rules.push(Rule::substitute(
        "wgsl-stype-cast",
        "WGPUSType_ShaderModuleWGSLDescriptor becomes its numeric sType value",
        pattern(r"\bWGPUSType_ShaderModuleWGSLDescriptor\b"),
        WGSL_STYPE_CAST,
    ));

    rules.push(Rule::substitute(
        "chain-address-of-member",
        "`nextInChain = &x.chain` becomes `nextInChain = (WGPUChainedStruct*)&x`",
        pattern(
            r"(?P<lhs>\bnextInChain[ \t]*=[ \t]*)&[ \t]*(?P<obj>[A-Za-z_][\w.]*?)\.chain\b",
        ),
        "${lhs}(WGPUChainedStruct*)&${obj}",
    ));

    rules.push(Rule::substitute(
        "chain-reinterpret-cast",
        "`nextInChain = reinterpret_cast<WGPUChainedStruct*>(&x)` becomes `(WGPUChainedStruct*)&x`",
        pattern(
            r"(?P<lhs>\bnextInChain[ \t]*=[ \t]*)reinterpret_cast<[ \t]*(?:const[ \t]+)?WGPUChainedStruct[ \t]*\*[ \t]*>\([ \t]*&[ \t]*(?P<obj>[A-Za-z_][\w.]*)[ \t]*\)",
        ),
        "${lhs}(WGPUChainedStruct*)&${obj}",
    ));

    rules.push(
        Rule::ensure_include(
            "include-cstring",
            "files calling strlen gain `#include <cstring>` after their last include",
            pattern(r"\bstrlen[ \t]*\("),
            "<cstring>",
        )
        .with_equivalents(["<string.h>"]),
    );

    rules
}
