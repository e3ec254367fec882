//! Function attribute notifications on `function_changes`.
//!
//! Functions are created by the importer and never deleted, so only
//! updates carry information.

use navi_core::{Address, ModuleId};
use serde::Serialize;
use tracing::debug;

use crate::error::NotifyError;
use crate::grammar::{int, ops, seq, Grammar, ANY_OP};
use crate::resolver::{DataLoader, FunctionData, ModelResolver};
use crate::table::{Channel, Operation, TableName};

/// A parsed `bn_functions` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FunctionRecord {
    pub operation: Operation,
    pub module: ModuleId,
    pub address: Address,
}

/// Fresh attributes for a loaded function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionEvent {
    pub module: ModuleId,
    pub address: Address,
    pub data: FunctionData,
}

/// Parser for the function channel.
#[derive(Debug, Clone)]
pub struct FunctionParser {
    grammar: Grammar,
}

impl FunctionParser {
    pub fn new() -> Result<Self, NotifyError> {
        let body = seq(&[ops(ANY_OP), int("module"), int("address")]);
        Ok(Self {
            grammar: Grammar::new(TableName::Functions, &body)?,
        })
    }

    pub fn parse(&self, table: TableName, line: &str) -> Result<FunctionRecord, NotifyError> {
        if table != TableName::Functions {
            return Err(NotifyError::Unsupported {
                table: table.as_str(),
                channel: Channel::Functions.name(),
            });
        }
        let f = self.grammar.fields(line)?;
        Ok(FunctionRecord {
            operation: f.operation()?,
            module: f.get("module")?,
            address: f.get("address")?,
        })
    }

    /// Reloads the function row for updates to loaded functions.
    pub fn resolve<M, L>(
        &self,
        record: &FunctionRecord,
        model: &M,
        loader: &L,
    ) -> Result<Vec<FunctionEvent>, NotifyError>
    where
        M: ModelResolver + ?Sized,
        L: DataLoader + ?Sized,
    {
        if record.operation != Operation::Update {
            debug!(operation = %record.operation, "ignoring function row operation");
            return Ok(Vec::new());
        }
        if !model.is_module_loaded(record.module)
            || !model.has_function(record.module, record.address)
        {
            return Ok(Vec::new());
        }
        let data = loader.load_function(record.module, record.address)?;
        Ok(vec![FunctionEvent {
            module: record.module,
            address: record.address,
            data,
        }])
    }
}
