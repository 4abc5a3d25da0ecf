//! Guest module validation — ABI compatibility checks.
//!
//! Validates that a compiled module can be driven by the bridge before it
//! is accepted. Checks:
//!
//! 1. `memory` export present
//! 2. Required allocator exports present with correct signatures
//! 3. Optional lifecycle and closure exports, if present, have the right shape
//! 4. All imports are functions from the `hostbridge` module, none WASI

use wasmtime::{ExternType, Module, ValType};

use hostbridge_primitives::types::{
    EXPORT_DROP_CLOSURE, EXPORT_INVOKE_CLOSURE, EXPORT_MALLOC, EXPORT_MEMORY, EXPORT_REALLOC,
    EXPORT_START,
};
use hostbridge_primitives::IMPORT_MODULE;

use crate::error::BridgeError;

fn is_i32(vt: &ValType) -> bool {
    matches!(vt, ValType::I32)
}

/// Expected export: (name, i32 param count, i32 result count).
const REQUIRED_EXPORTS: &[(&str, usize, usize)] = &[(EXPORT_MALLOC, 1, 1), (EXPORT_REALLOC, 3, 1)];

const OPTIONAL_EXPORTS: &[(&str, usize, usize)] = &[
    (EXPORT_START, 0, 0),
    (EXPORT_INVOKE_CLOSURE, 3, 0),
    (EXPORT_DROP_CLOSURE, 3, 0),
];

/// Validate that a module meets the bridge ABI.
pub fn validate_module(module: &Module) -> Result<(), BridgeError> {
    validate_exports(module)?;
    validate_imports(module)?;
    Ok(())
}

fn validate_exports(module: &Module) -> Result<(), BridgeError> {
    let has_memory = module
        .exports()
        .any(|e| e.name() == EXPORT_MEMORY && matches!(e.ty(), ExternType::Memory(_)));
    if !has_memory {
        return Err(BridgeError::Validation(format!("module must export '{}'", EXPORT_MEMORY)));
    }

    for &(name, params, results) in REQUIRED_EXPORTS {
        if module.get_export(name).is_none() {
            return Err(BridgeError::Validation(format!("missing required export: {}", name)));
        }
        check_signature(module, name, params, results)?;
    }

    for &(name, params, results) in OPTIONAL_EXPORTS {
        if module.get_export(name).is_some() {
            check_signature(module, name, params, results)?;
        }
    }
    Ok(())
}

fn check_signature(module: &Module, name: &str, param_count: usize, result_count: usize) -> Result<(), BridgeError> {
    let func_ty = match module.get_export(name) {
        Some(ExternType::Func(ft)) => ft,
        _ => {
            return Err(BridgeError::Validation(format!("export '{}' must be a function", name)));
        }
    };

    let params: Vec<ValType> = func_ty.params().collect();
    let results: Vec<ValType> = func_ty.results().collect();

    if params.len() != param_count || !params.iter().all(is_i32) {
        return Err(BridgeError::Validation(format!(
            "export '{}' has wrong param signature: expected {} i32 params, got {} params",
            name,
            param_count,
            params.len()
        )));
    }
    if results.len() != result_count || !results.iter().all(is_i32) {
        return Err(BridgeError::Validation(format!(
            "export '{}' has wrong result signature: expected {} i32 results, got {} results",
            name,
            result_count,
            results.len()
        )));
    }
    Ok(())
}

fn validate_imports(module: &Module) -> Result<(), BridgeError> {
    for import in module.imports() {
        let module_name = import.module();

        if module_name.starts_with("wasi") {
            return Err(BridgeError::Validation(format!(
                "WASI import not allowed: {}::{}",
                module_name,
                import.name()
            )));
        }

        if module_name != IMPORT_MODULE {
            return Err(BridgeError::Validation(format!(
                "import from unknown module '{}' (only '{}' allowed): {}",
                module_name,
                IMPORT_MODULE,
                import.name()
            )));
        }

        if !matches!(import.ty(), ExternType::Func(_)) {
            return Err(BridgeError::Validation(format!(
                "non-function import not allowed: {}::{}",
                module_name,
                import.name()
            )));
        }
    }
    Ok(())
}
