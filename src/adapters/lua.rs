use crate::domain::model::RawRow;
use crate::domain::ports::{ScriptFunction, Storage};
use crate::utils::error::{CheckoutError, Result};
use mlua::{Function, Lua, Table, Value as LuaValue};
use serde_json::{Map, Number, Value};
use std::path::Path;

/// A transform written in Lua.
///
/// The chunk either returns a function or defines a global `transform`. The
/// function receives the row as a table keyed by column label and must
/// return a table, e.g.:
///
/// ```lua
/// return function(row)
///   return {
///     amount = tonumber(row["Totale"]),
///     creditor_iban = "IT60X0542811101000000123456",
///     vat_code = row["Cliente"],
///     expire_date = row["Scadenza"],
///     remittance = "Fattura " .. row["Numero"],
///   }
/// end
/// ```
pub struct LuaScript {
    lua: Lua,
    function: Function,
    name: String,
}

impl LuaScript {
    /// Reads the script through `storage`; the file name becomes the script
    /// name used in error messages.
    pub async fn load<S: Storage>(storage: &S, path: &str) -> Result<Self> {
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string());
        let read_error = |message: String| CheckoutError::ScriptLoadError {
            script: name.clone(),
            message: format!("Failed to read {}: {}", path, message),
        };
        let bytes = storage
            .read_file(path)
            .await
            .map_err(|e| read_error(e.to_string()))?;
        let source = String::from_utf8(bytes).map_err(|e| read_error(e.to_string()))?;
        Self::from_source(&source, &name)
    }

    pub fn from_source(source: &str, name: &str) -> Result<Self> {
        let load_error = |message: String| CheckoutError::ScriptLoadError {
            script: name.to_string(),
            message,
        };

        let lua = Lua::new();
        let returned: LuaValue = lua
            .load(source)
            .set_name(name)
            .eval()
            .map_err(|e| load_error(format!("Lua error: {}", e)))?;

        let function = match returned {
            LuaValue::Function(function) => function,
            _ => lua
                .globals()
                .get::<Option<Function>>("transform")
                .map_err(|e| load_error(format!("Lua error: {}", e)))?
                .ok_or_else(|| {
                    load_error(
                        "the script must return a function or define a global 'transform'"
                            .to_string(),
                    )
                })?,
        };

        tracing::debug!("Loaded Lua transform '{}'", name);
        Ok(Self {
            lua,
            function,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn row_to_table(&self, row: &RawRow) -> mlua::Result<Table> {
        let table = self.lua.create_table()?;
        for (label, value) in &row.data {
            match value {
                Value::Null => {}
                Value::Bool(b) => table.set(label.as_str(), *b)?,
                Value::Number(n) => match n.as_i64() {
                    Some(i) => table.set(label.as_str(), i)?,
                    None => table.set(label.as_str(), n.as_f64().unwrap_or_default())?,
                },
                Value::String(s) => table.set(label.as_str(), s.as_str())?,
                other => table.set(label.as_str(), other.to_string())?,
            }
        }
        Ok(table)
    }
}

/// Converts a returned Lua value to JSON. Nested tables are not part of the
/// row vocabulary.
fn lua_to_json(value: LuaValue) -> std::result::Result<Value, String> {
    match value {
        LuaValue::Nil => Ok(Value::Null),
        LuaValue::Boolean(b) => Ok(Value::Bool(b)),
        LuaValue::Integer(n) => Ok(Value::Number(n.into())),
        LuaValue::Number(n) => Number::from_f64(n)
            .map(Value::Number)
            .ok_or_else(|| format!("non-finite number {}", n)),
        LuaValue::String(s) => s
            .to_str()
            .map(|s| Value::String(s.to_string()))
            .map_err(|e| e.to_string()),
        other => Err(format!("unsupported value of type {}", other.type_name())),
    }
}

impl ScriptFunction for LuaScript {
    fn call(&self, index: usize, row: &RawRow) -> Result<Map<String, Value>> {
        let script_error = |message: String| CheckoutError::ScriptError {
            script: self.name.clone(),
            row: index,
            message,
        };

        let input = self
            .row_to_table(row)
            .map_err(|e| script_error(format!("Lua error: {}", e)))?;
        let returned: LuaValue = self
            .function
            .call(input)
            .map_err(|e| script_error(format!("Lua error: {}", e)))?;

        let LuaValue::Table(table) = returned else {
            return Err(CheckoutError::ScriptContractError {
                script: self.name.clone(),
                row: index,
                reason: format!("expected a table, got {}", returned.type_name()),
            });
        };

        let mut output = Map::new();
        for pair in table.pairs::<String, LuaValue>() {
            let (key, value) = pair.map_err(|e| script_error(format!("Lua error: {}", e)))?;
            let value = lua_to_json(value).map_err(|reason| CheckoutError::ScriptContractError {
                script: self.name.clone(),
                row: index,
                reason: format!("'{}': {}", key, reason),
            })?;
            output.insert(key, value);
        }
        Ok(output)
    }
}
