//! Full runs over a mock renderer checkout.

use api_rewriter::config::{load_from_str, ScanConfig};
use api_rewriter::{run, webgpu_rules, LengthStyle, RewriteError, RunOptions};
use filetime::FileTime;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SHADER_PROGRAM: &str = r#"#include <mbgl/shaders/webgpu/shader_program.hpp>
#include <mbgl/util/logging.hpp>

namespace mbgl {
namespace webgpu {

void ShaderProgram::build(const std::string& vertexSource, const std::string& fragmentSource) {
    WGPUShaderModuleWGSLDescriptor wgslDesc = {};
    wgslDesc.chain.sType = WGPUSType_ShaderModuleWGSLDescriptor;
    wgslDesc.code = vertexSource.c_str();

    WGPUShaderModuleDescriptor vertexShaderDesc = {};
    vertexShaderDesc.label = "Vertex Shader Module";
    vertexShaderDesc.nextInChain = reinterpret_cast<WGPUChainedStruct*>(&wgslDesc);
    vertexShaderModule = wgpuDeviceCreateShaderModule(device, &vertexShaderDesc);

    wgslDesc.code = fragmentSource.c_str();

    WGPUVertexState vertexState = {};
    vertexState.entryPoint = "main";

    WGPUMultisampleState multisample = {};
    multisample.alphaToCoverageEnabled = false;
}

} // namespace webgpu
} // namespace mbgl
"#;

const SHADER_PROGRAM_EXPECTED: &str = r#"#include <mbgl/shaders/webgpu/shader_program.hpp>
#include <mbgl/util/logging.hpp>

namespace mbgl {
namespace webgpu {

void ShaderProgram::build(const std::string& vertexSource, const std::string& fragmentSource) {
    WGPUShaderModuleWGSLDescriptor wgslDesc = {};
    wgslDesc.chain.sType = (WGPUSType)0x00040006;
    WGPUStringView vertexSourceCode = {vertexSource.c_str(), vertexSource.length()};
    wgslDesc.code = vertexSourceCode;

    WGPUShaderModuleDescriptor vertexShaderDesc = {};
    WGPUStringView vertexShaderDescLabel = {"Vertex Shader Module", 20};
    vertexShaderDesc.label = vertexShaderDescLabel;
    vertexShaderDesc.nextInChain = (WGPUChainedStruct*)&wgslDesc;
    vertexShaderModule = wgpuDeviceCreateShaderModule(device, &vertexShaderDesc);

    WGPUStringView fragmentSourceCode = {fragmentSource.c_str(), fragmentSource.length()};
    wgslDesc.code = fragmentSourceCode;

    WGPUVertexState vertexState = {};
    WGPUStringView vertexStateEntryPoint = {"main", 4};
    vertexState.entryPoint = vertexStateEntryPoint;

    WGPUMultisampleState multisample = {};
    multisample.alphaToCoverageEnabled = 0;
}

} // namespace webgpu
} // namespace mbgl
"#;

const CONTEXT_ALREADY_MIGRATED: &str = r#"#include <mbgl/webgpu/context.hpp>
#include <cstring>

void f(WGPUPrimitiveState& prim) {
    prim.unclippedDepth = 0;
    size_t n = strlen("x");
}
"#;

const BACKEND_NEEDS_INCLUDE: &str = r#"#include <mbgl/webgpu/renderer_backend.hpp>
#include <webgpu/webgpu.h>

size_t nameLength(const char* name) {
    return strlen(name);
}
"#;

fn setup_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let ws = dir.path();

    fs::create_dir_all(ws.join("src/mbgl/webgpu")).unwrap();
    fs::create_dir_all(ws.join("src/mbgl/shaders/webgpu")).unwrap();
    fs::create_dir_all(ws.join("src/mbgl/gl")).unwrap();

    fs::write(
        ws.join("src/mbgl/shaders/webgpu/shader_program.cpp"),
        SHADER_PROGRAM,
    )
    .unwrap();
    fs::write(
        ws.join("src/mbgl/webgpu/context.cpp"),
        CONTEXT_ALREADY_MIGRATED,
    )
    .unwrap();
    fs::write(
        ws.join("src/mbgl/webgpu/renderer_backend.cpp"),
        BACKEND_NEEDS_INCLUDE,
    )
    .unwrap();
    // Outside the default roots
    fs::write(
        ws.join("src/mbgl/gl/context.cpp"),
        "desc.label = \"gl\";\n",
    )
    .unwrap();

    dir
}

#[test]
fn test_default_roots_rewrite_webgpu_sources() {
    let workspace = setup_workspace();
    let ws = workspace.path();

    let rules = webgpu_rules(LengthStyle::Literal);
    let summary = run(&ScanConfig::default(), ws, &rules, RunOptions::default()).unwrap();

    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.modified(), 2);

    let program =
        fs::read_to_string(ws.join("src/mbgl/shaders/webgpu/shader_program.cpp")).unwrap();
    assert_eq!(program, SHADER_PROGRAM_EXPECTED);

    let backend = fs::read_to_string(ws.join("src/mbgl/webgpu/renderer_backend.cpp")).unwrap();
    assert_eq!(
        backend,
        BACKEND_NEEDS_INCLUDE.replace(
            "#include <webgpu/webgpu.h>\n",
            "#include <webgpu/webgpu.h>\n#include <cstring>\n"
        )
    );

    assert_eq!(
        fs::read_to_string(ws.join("src/mbgl/gl/context.cpp")).unwrap(),
        "desc.label = \"gl\";\n"
    );
}

#[test]
fn test_unmodified_file_is_not_written() {
    let workspace = setup_workspace();
    let ws = workspace.path();
    let migrated = ws.join("src/mbgl/webgpu/context.cpp");

    let old = FileTime::from_unix_time(1_000_000_000, 0);
    filetime::set_file_mtime(&migrated, old).unwrap();

    let rules = webgpu_rules(LengthStyle::Literal);
    let summary = run(&ScanConfig::default(), ws, &rules, RunOptions::default()).unwrap();

    let changed: Vec<PathBuf> = summary.changes.iter().map(|c| c.path.clone()).collect();
    assert!(!changed.contains(&PathBuf::from("src/mbgl/webgpu/context.cpp")));

    let meta = fs::metadata(&migrated).unwrap();
    assert_eq!(FileTime::from_last_modification_time(&meta), old);
    assert_eq!(
        fs::read_to_string(&migrated).unwrap(),
        CONTEXT_ALREADY_MIGRATED
    );
}

#[test]
fn test_second_run_modifies_nothing() {
    let workspace = setup_workspace();
    let ws = workspace.path();

    let rules = webgpu_rules(LengthStyle::Strlen);
    let first = run(&ScanConfig::default(), ws, &rules, RunOptions::default()).unwrap();
    assert_eq!(first.modified(), 2);

    let second = run(&ScanConfig::default(), ws, &rules, RunOptions::default()).unwrap();
    assert_eq!(second.scanned, 3);
    assert_eq!(second.modified(), 0);
}

#[test]
fn test_config_selects_roots_and_custom_rules() {
    let workspace = setup_workspace();
    let ws = workspace.path();

    let config = load_from_str(
        r#"
[scan]
roots = ["src/mbgl"]
suffixes = [".cpp"]
exclude = ["shaders"]

[rewrite]
builtin = false

[[rules]]
name = "gl-label"
type = "substitute"
pattern = '"gl"'
replace = '"opengl"'
"#,
    )
    .unwrap();
    let rules = config.rule_set().unwrap();
    let summary = run(&config.scan, ws, &rules, RunOptions::default()).unwrap();

    // shaders/ pruned, so only gl/context.cpp and the two webgpu files are scanned
    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.modified(), 1);
    assert_eq!(
        summary.changes[0].path,
        PathBuf::from("src/mbgl/gl/context.cpp")
    );
    assert_eq!(
        fs::read_to_string(ws.join("src/mbgl/gl/context.cpp")).unwrap(),
        "desc.label = \"opengl\";\n"
    );
}

#[test]
fn test_unreadable_file_aborts_run() {
    let workspace = setup_workspace();
    let ws = workspace.path();
    fs::write(ws.join("src/mbgl/webgpu/binary.cpp"), [0xffu8, 0xfe, 0xfd]).unwrap();

    let rules = webgpu_rules(LengthStyle::Literal);
    let result = run(&ScanConfig::default(), ws, &rules, RunOptions::default());
    assert!(matches!(result, Err(RewriteError::Read { .. })));
}
