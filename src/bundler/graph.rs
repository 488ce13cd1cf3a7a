//! Module table recovered from a bundle's definition statements

use std::collections::HashMap;

use globset::GlobMatcher;
use tracing::{debug, info, warn};

use crate::assets::{is_asset_module, AssetDescriptor};
use crate::error::SplitError;
use crate::recognizer::{ArgNode, ByteRange, Definition, Invocation, Statement, StatementKind};
use crate::report::Anomaly;
use crate::utils::preview;

/// Bundler-assigned module identifier
pub type ModuleId = usize;

/// Names under which the bundler registers the runtime entry module
pub const RUNTIME_ENTRY_NAMES: &[&str] = &[
    "react-native-implementation",
    "react-native/Libraries/react-native/react-native.js",
];

pub fn is_runtime_entry(module_name: &str) -> bool {
    RUNTIME_ENTRY_NAMES.contains(&module_name)
}

/// One module definition of the bundle
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRecord {
    pub id: ModuleId,

    /// Original module path, used as the stable reference after splitting
    pub name: String,

    /// Ids invoked by the factory body, first appearance order, no repeats
    pub dependency_ids: Vec<ModuleId>,

    /// Every numeric invocation in the factory body, relative to `body_range.start`
    pub invocations: Vec<Invocation>,

    /// The whole definition statement
    pub body_range: ByteRange,

    /// The numeric id argument, relative to `body_range.start`
    pub id_literal_range: ByteRange,

    pub is_asset: bool,
    pub asset: Option<AssetDescriptor>,
}

impl ModuleRecord {
    /// Statement text of this module
    pub fn code<'a>(&self, source: &'a str) -> &'a str {
        self.body_range.slice(source)
    }
}

/// A trailing `require(<id>)` statement
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationStatement {
    pub range: ByteRange,
    /// Relative to `range.start`
    pub invocations: Vec<Invocation>,
}

/// All modules of a bundle, in the order they were defined
#[derive(Debug, Default)]
pub struct ModuleTable {
    modules: Vec<ModuleRecord>,

    /// Map from module id to position in `modules`
    index: HashMap<ModuleId, usize>,

    runtime_entry: Option<ModuleId>,
}

impl ModuleTable {
    /// Create a new empty module table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module; ids must be unique
    pub fn insert(&mut self, module: ModuleRecord) -> Result<(), SplitError> {
        if self.index.contains_key(&module.id) {
            return Err(SplitError::DuplicateModuleId {
                id: module.id,
                range: module.body_range,
            });
        }
        if self.runtime_entry.is_none() && is_runtime_entry(&module.name) {
            self.runtime_entry = Some(module.id);
        }
        self.index.insert(module.id, self.modules.len());
        self.modules.push(module);
        Ok(())
    }

    /// Get a module by ID
    pub fn get(&self, id: ModuleId) -> Option<&ModuleRecord> {
        self.index.get(&id).map(|&pos| &self.modules[pos])
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.index.contains_key(&id)
    }

    /// Modules in definition order
    pub fn iter(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.modules.iter().map(|m| m.id)
    }

    /// Ids of modules whose name matches `matcher`, in definition order
    pub fn matching<'a>(&'a self, matcher: &'a GlobMatcher) -> impl Iterator<Item = ModuleId> + 'a {
        self.modules
            .iter()
            .filter(move |m| matcher.is_match(&m.name))
            .map(|m| m.id)
    }

    /// The react-native entry module, when the bundle has one
    pub fn runtime_entry(&self) -> Option<ModuleId> {
        self.runtime_entry
    }

    /// Total number of modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if table is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Module table plus the non-module statements that surround it
#[derive(Debug, Default)]
pub struct TableBuild {
    pub table: ModuleTable,

    /// Runtime bootstrap statements before the first definition, in bundle order
    pub leading: Vec<ByteRange>,

    /// Module invocations that start the application, in bundle order
    pub trailing: Vec<InvocationStatement>,

    pub anomalies: Vec<Anomaly>,
}

/// Build the module table from recognized statements
///
/// Fails on the first definition statement that lacks the expected structure.
pub fn build_module_table(
    source: &str,
    statements: &[Statement],
) -> Result<TableBuild, SplitError> {
    let mut build = TableBuild::default();

    for statement in statements {
        match &statement.kind {
            StatementKind::Empty => {}
            StatementKind::Bootstrap if build.table.is_empty() => {
                build.leading.push(statement.range)
            }
            StatementKind::Bootstrap => {
                let preview = preview(statement.range.slice(source), 80);
                warn!(
                    "Bootstrap code after module definitions at {}: {}",
                    statement.range, preview
                );
                build.anomalies.push(Anomaly::MisplacedBootstrap {
                    range: statement.range,
                    preview,
                });
            }
            StatementKind::Invocation(invocation) => {
                build.trailing.push(InvocationStatement {
                    range: statement.range,
                    invocations: vec![Invocation {
                        target: invocation.target,
                        range: invocation.range.relative_to(statement.range.start),
                    }],
                });
            }
            StatementKind::Definition(definition) => {
                let module = module_record(statement.range, definition)?;
                debug!(
                    "Module {}({}) dependency: {:?}",
                    module.name, module.id, module.dependency_ids
                );
                if module.is_asset && module.asset.is_none() {
                    warn!("Asset module {} has no readable descriptor", module.name);
                    build.anomalies.push(Anomaly::AssetWithoutDescriptor {
                        module_id: module.id,
                        name: module.name.clone(),
                    });
                }
                build.table.insert(module)?;
            }
            StatementKind::Other => {
                let preview = preview(statement.range.slice(source), 80);
                warn!("Cannot parse statement at {}: {}", statement.range, preview);
                build.anomalies.push(Anomaly::UnparsedStatement {
                    range: statement.range,
                    preview,
                });
            }
        }
    }

    match build.table.runtime_entry() {
        Some(id) => info!("Found react-native entry module ({})", id),
        None => {
            warn!(
                "Cannot find react-native entry module! \
                 You should require('react-native') at some entry."
            );
            build.anomalies.push(Anomaly::MissingRuntimeEntry);
        }
    }
    info!("Total modules: {}", build.table.len());

    Ok(build)
}

/// Read `__d(factory, id, dependencies, name, ...)`
fn module_record(range: ByteRange, definition: &Definition) -> Result<ModuleRecord, SplitError> {
    let malformed = |reason: String| SplitError::MalformedModuleStatement { range, reason };
    let args = &definition.args;

    let [factory, id_arg, deps_arg, name_arg, ..] = args.as_slice() else {
        return Err(malformed(format!("expected at least 4 arguments, found {}", args.len())));
    };

    if !matches!(factory, ArgNode::Function { .. }) {
        return Err(malformed(format!(
            "first argument must be the module factory, found {}",
            factory.describe()
        )));
    }

    let (id, id_range) = match id_arg {
        ArgNode::Number { raw, range: id_range } => {
            let id = raw.parse::<ModuleId>().map_err(|_| {
                malformed(format!("module id `{}` is not a non-negative integer", raw))
            })?;
            (id, *id_range)
        }
        other => {
            return Err(malformed(format!(
                "second argument must be the module id, found {}",
                other.describe()
            )))
        }
    };

    if !matches!(deps_arg, ArgNode::Array { .. } | ArgNode::Null(_)) {
        return Err(malformed(format!(
            "third argument must be the dependency list, found {}",
            deps_arg.describe()
        )));
    }

    let name = match name_arg {
        ArgNode::Str { value, .. } => value.clone(),
        other => {
            return Err(malformed(format!(
                "fourth argument must be the module name, found {}",
                other.describe()
            )))
        }
    };

    let invocations: Vec<Invocation> = definition
        .invocations
        .iter()
        .map(|invocation| Invocation {
            target: invocation.target,
            range: invocation.range.relative_to(range.start),
        })
        .collect();

    let mut dependency_ids = Vec::with_capacity(invocations.len());
    for invocation in &invocations {
        if !dependency_ids.contains(&invocation.target) {
            dependency_ids.push(invocation.target);
        }
    }

    let is_asset = is_asset_module(&name);
    let asset = if is_asset {
        definition
            .asset_literal
            .as_ref()
            .and_then(|literal| AssetDescriptor::from_literal(literal, range.start))
    } else {
        None
    };
    if let Some(asset) = &asset {
        info!("Get asset module {} ({} scale(s))", name, asset.scales.len());
    }

    Ok(ModuleRecord {
        id,
        name,
        dependency_ids,
        invocations,
        body_range: range,
        id_literal_range: id_range.relative_to(range.start),
        is_asset,
        asset,
    })
}
