//! Closure computation: which modules go into which bundle
//!
//! Base is grown first from the runtime entry, the include patterns and the
//! base entry. Each secondary entry then gets every module it reaches that
//! base does not already hold. Secondary bundles are not checked against each
//! other, so two features sharing a non-base module both carry it.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, info, warn};

use super::chunk::BundleSpec;
use super::graph::{ModuleId, ModuleTable};
use crate::config::PartitionConfig;
use crate::error::SplitError;
use crate::report::Anomaly;
use crate::utils::glob_matcher;

/// The module sets of every output bundle
#[derive(Debug)]
pub struct Partition {
    pub base: BundleSpec,
    pub secondaries: Vec<BundleSpec>,
    /// Only present when no secondary entries are configured
    pub remainder: Option<BundleSpec>,
    pub base_entry: ModuleId,
    pub anomalies: Vec<Anomaly>,
}

impl Partition {
    /// Base first, then secondaries in configuration order, then the remainder
    pub fn bundles(&self) -> impl Iterator<Item = &BundleSpec> {
        std::iter::once(&self.base)
            .chain(self.secondaries.iter())
            .chain(self.remainder.iter())
    }

    /// Entry module ids of all secondary bundles
    pub fn secondary_entry_ids(&self) -> HashSet<ModuleId> {
        self.secondaries.iter().filter_map(|b| b.entry_module_id).collect()
    }
}

/// Entry points resolved against the module table
struct Seeds {
    base_entry: ModuleId,
    includes: Vec<ModuleId>,
    secondaries: Vec<(String, ModuleId)>,
}

/// Compute base, secondary and remainder module sets
///
/// Patterns that match nothing fail before any closure is computed.
pub fn partition(table: &ModuleTable, config: &PartitionConfig) -> Result<Partition, SplitError> {
    let mut anomalies = Vec::new();
    let seeds = resolve_seeds(table, config, &mut anomalies)?;
    let mut engine = Closure {
        table,
        anomalies,
        reported: HashSet::new(),
    };
    let nothing = HashSet::new();

    let mut base = HashSet::new();
    if let Some(runtime) = table.runtime_entry() {
        base = engine.close(runtime, &engine.dependencies(runtime), &nothing, base, "base");
    }
    for &include in &seeds.includes {
        base = engine.close(include, &engine.dependencies(include), &nothing, base, "base");
    }

    // The base entry requires every injected feature entry; cut those edges
    let secondary_ids: HashSet<ModuleId> = seeds.secondaries.iter().map(|(_, id)| *id).collect();
    let entry_deps: Vec<ModuleId> = engine
        .dependencies(seeds.base_entry)
        .into_iter()
        .filter(|dep| !secondary_ids.contains(dep))
        .collect();
    base = engine.close(seeds.base_entry, &entry_deps, &nothing, base, "base");
    info!("Base modules size: {}", base.len());

    let mut secondaries = Vec::with_capacity(seeds.secondaries.len());
    for (name, entry) in seeds.secondaries {
        let set = if base.contains(&entry) {
            warn!("Entry module {} of bundle {} is already part of base", entry, name);
            engine.anomalies.push(Anomaly::EntryAbsorbedByBase {
                bundle: name.clone(),
                module_id: entry,
            });
            HashSet::new()
        } else {
            engine.close(entry, &engine.dependencies(entry), &base, HashSet::new(), &name)
        };
        secondaries.push(BundleSpec::secondary(name, entry, set));
    }

    let mut anomalies = engine.anomalies;
    let remainder = if config.is_partitioned() {
        let unplaced: Vec<ModuleId> = table
            .ids()
            .filter(|id| !base.contains(id) && !secondaries.iter().any(|s| s.contains(*id)))
            .collect();
        if !unplaced.is_empty() {
            warn!("{} module(s) are not reachable from any entry", unplaced.len());
            anomalies.push(Anomaly::UnplacedModules { ids: unplaced });
        }
        None
    } else {
        let rest: HashSet<ModuleId> = table.ids().filter(|id| !base.contains(id)).collect();
        info!("Remainder modules size: {}", rest.len());
        Some(BundleSpec::remainder(rest))
    };

    Ok(Partition {
        base: BundleSpec::base(base),
        secondaries,
        remainder,
        base_entry: seeds.base_entry,
        anomalies,
    })
}

fn resolve_seeds(
    table: &ModuleTable,
    config: &PartitionConfig,
    anomalies: &mut Vec<Anomaly>,
) -> Result<Seeds, SplitError> {
    let matcher = glob_matcher(&config.base_entry_name)?;
    let mut matches = table.matching(&matcher);
    let base_entry = matches.next().ok_or_else(|| SplitError::UnmatchedPattern {
        role: "base entry".to_string(),
        pattern: config.base_entry_name.clone(),
    })?;
    if matches.next().is_some() {
        warn!(
            "Base entry pattern {} matches several modules, using {}",
            config.base_entry_name, base_entry
        );
    }
    info!("Get base entry module: {}", base_entry);

    let mut includes = Vec::new();
    for pattern in &config.base_include_patterns {
        let matcher = glob_matcher(pattern)?;
        let before = includes.len();
        includes.extend(table.matching(&matcher).filter(|id| *id != base_entry));
        if includes.len() == before {
            warn!("Base include pattern {} matches no module", pattern);
            anomalies.push(Anomaly::UnmatchedInclude {
                pattern: pattern.clone(),
            });
        }
    }

    let mut secondaries = Vec::with_capacity(config.secondary_entries.len());
    for entry in &config.secondary_entries {
        let matcher = glob_matcher(&entry.index_glob)?;
        let id = table
            .matching(&matcher)
            .find(|id| *id != base_entry)
            .ok_or_else(|| SplitError::UnmatchedPattern {
                role: format!("secondary entry `{}`", entry.name),
                pattern: entry.index_glob.clone(),
            })?;
        info!("Get custom entry module {} for bundle {}", id, entry.name);
        secondaries.push((entry.name.clone(), id));
    }

    Ok(Seeds {
        base_entry,
        includes,
        secondaries,
    })
}

struct Closure<'a> {
    table: &'a ModuleTable,
    anomalies: Vec<Anomaly>,
    /// (module, missing dependency) pairs already reported
    reported: HashSet<(ModuleId, ModuleId)>,
}

impl Closure<'_> {
    fn dependencies(&self, id: ModuleId) -> Vec<ModuleId> {
        self.table
            .get(id)
            .map(|m| m.dependency_ids.clone())
            .unwrap_or_default()
    }

    /// Add `seed` and everything reachable from `seed_deps` to `set`
    ///
    /// Ids in `exclude` are neither added nor walked through. A seed that is
    /// already in the set leaves it untouched.
    fn close(
        &mut self,
        seed: ModuleId,
        seed_deps: &[ModuleId],
        exclude: &HashSet<ModuleId>,
        mut set: HashSet<ModuleId>,
        bundle: &str,
    ) -> HashSet<ModuleId> {
        if exclude.contains(&seed) || !set.insert(seed) {
            return set;
        }

        let mut queue: VecDeque<(ModuleId, ModuleId)> =
            seed_deps.iter().map(|&dep| (seed, dep)).collect();
        let mut added = 0usize;
        while let Some((from, id)) = queue.pop_front() {
            if set.contains(&id) || exclude.contains(&id) {
                continue;
            }
            let Some(module) = self.table.get(id) else {
                if self.reported.insert((from, id)) {
                    warn!("Module {} depends on unknown module {}", from, id);
                    self.anomalies.push(Anomaly::UnknownDependency {
                        module_id: from,
                        target: id,
                    });
                }
                continue;
            };
            set.insert(id);
            added += 1;
            queue.extend(
                module
                    .dependency_ids
                    .iter()
                    .filter(|dep| !set.contains(dep) && !exclude.contains(dep))
                    .map(|&dep| (id, dep)),
            );
        }

        let name = self.table.get(seed).map(|m| m.name.as_str()).unwrap_or("?");
        debug!(
            "Module {} added to bundle {} ({} more dependency added too)",
            name, bundle, added
        );
        set
    }
}
