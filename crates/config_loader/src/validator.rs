//! 配置校验模块
//!
//! 校验规则：
//! - 端口名非空且无首尾空白
//! - 统计与远端参数在合法范围内 (validator)
//! - 路由表每一行格式合法

use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use contracts::{ContractError, PortConfig};

/// 校验 PortConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &PortConfig) -> Result<(), ContractError> {
    validate_name(config)?;
    validate_ranges(config)?;
    validate_connection_table(config)?;
    Ok(())
}

/// 校验端口名
fn validate_name(config: &PortConfig) -> Result<(), ContractError> {
    if config.name.is_empty() {
        return Err(ContractError::config_validation(
            "name",
            "port name cannot be empty",
        ));
    }
    if config.name.trim() != config.name {
        return Err(ContractError::config_validation(
            "name",
            format!("port name '{}' has surrounding whitespace", config.name),
        ));
    }
    Ok(())
}

/// 校验数值范围
fn validate_ranges(config: &PortConfig) -> Result<(), ContractError> {
    let Err(errors) = config.validate() else {
        return Ok(());
    };
    let mut flat = Vec::new();
    flatten("", &errors, &mut flat);
    flat.sort();
    match flat.into_iter().next() {
        Some((field, message)) => Err(ContractError::config_validation(field, message)),
        None => Ok(()),
    }
}

/// 展开嵌套的校验错误为 (字段路径, 信息)
fn flatten(prefix: &str, errors: &ValidationErrors, out: &mut Vec<(String, String)>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let message = match &error.message {
                        Some(message) => message.to_string(),
                        None => format!("failed '{}' check", error.code),
                    };
                    out.push((path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    flatten(&format!("{path}[{idx}]"), inner, out);
                }
            }
        }
    }
}

/// 校验路由表
fn validate_connection_table(config: &PortConfig) -> Result<(), ContractError> {
    for (idx, rule) in config.connection_table.iter().enumerate() {
        rule.check().map_err(|e| match e {
            ContractError::ConfigValidation { field, message } => {
                ContractError::config_validation(format!("connection_table[{idx}].{field}"), message)
            }
            other => other,
        })?;
    }
    Ok(())
}
