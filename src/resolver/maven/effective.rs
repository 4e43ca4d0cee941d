//! Effective descriptor model: parent chain, BOM imports and `${property}`
//! interpolation folded into one immutable value per descriptor.
//!
//! Each step returns a new merged table built from its ancestor's value; no
//! table is shared or mutated across steps. Ancestors and imports are loaded
//! through a [`PomSource`] and cached per builder.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use super::pom::{parse_pom, read_pom, DependencyDecl, Exclusion, ParentRef, PomModel};
use crate::error::{ResolveError, Result};
use crate::models::{Scope, UNKNOWN};
use crate::registry::maven::{ArtifactKey, PomSource};

const MAX_INTERPOLATION_PASSES: usize = 10;

/// One entry of the managed-version table.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedDependency {
    pub version: String,
    pub scope: Option<Scope>,
    pub exclusions: Vec<Exclusion>,
}

/// A dependency declaration with its version and scope settled.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDependency {
    pub group_id: String,
    pub artifact_id: String,
    /// [`UNKNOWN`] when no version could be determined.
    pub version: String,
    pub scope: Scope,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
}

impl ResolvedDependency {
    pub fn key(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }
}

#[derive(Debug, Clone)]
pub struct EffectiveModel {
    pub key: ArtifactKey,
    pub packaging: String,
    pub properties: BTreeMap<String, String>,
    /// Managed versions keyed by `group:artifact`.
    pub managed: BTreeMap<String, ManagedDependency>,
    /// Own declarations first, then those inherited from ancestors.
    pub dependencies: Vec<ResolvedDependency>,
    /// `group:artifact` of the descriptor's own `<dependencies>` entries.
    pub declared: BTreeSet<String>,
}

/// Builds [`EffectiveModel`]s, loading ancestors and imports from a [`PomSource`].
pub struct ModelBuilder<'a> {
    source: &'a dyn PomSource,
    cache: RefCell<HashMap<ArtifactKey, Rc<EffectiveModel>>>,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(source: &'a dyn PomSource) -> Self {
        Self {
            source,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Effective model of the project descriptor at `pom_path`.
    pub fn build_project(&self, pom_path: &Path) -> Result<EffectiveModel> {
        let pom = read_pom(pom_path)?;
        let chain = vec![raw_key(&pom)];
        self.build(&pom, Some(pom_path), &chain)
    }

    /// Effective model of a repository artifact.
    pub fn load_artifact(&self, key: &ArtifactKey, chain: &[String]) -> Result<Rc<EffectiveModel>> {
        let chain = extend_chain(chain, &key.to_string())?;

        if let Some(model) = self.cache.borrow().get(key) {
            return Ok(Rc::clone(model));
        }

        let content = self.source.fetch_pom(key)?;
        let pom = parse_pom(&content, Path::new(&key.pom_path()))?;
        let model = Rc::new(self.build(&pom, None, &chain)?);

        self.cache.borrow_mut().insert(key.clone(), Rc::clone(&model));
        Ok(model)
    }

    /// `chain` already ends with this descriptor's own key.
    fn build(
        &self,
        pom: &PomModel,
        location: Option<&Path>,
        chain: &[String],
    ) -> Result<EffectiveModel> {
        let parent = match &pom.parent {
            Some(parent_ref) => self.parent_model(parent_ref, location, chain)?,
            None => None,
        };

        let properties = self.properties(pom, parent.as_deref());

        let group_id = interpolate_or_unknown(
            pom.effective_group_id().unwrap_or_default(),
            &properties,
            &pom.artifact_id,
        );
        let version = interpolate_or_unknown(
            pom.effective_version().unwrap_or_default(),
            &properties,
            &pom.artifact_id,
        );
        let key = ArtifactKey::new(&group_id, &pom.artifact_id, &version);

        let managed = self.managed_table(pom, parent.as_deref(), &properties, chain)?;
        let (dependencies, declared) =
            resolve_dependencies(pom, parent.as_deref(), &managed, &properties, &key);

        Ok(EffectiveModel {
            key,
            packaging: pom.packaging.clone().unwrap_or_else(|| "jar".to_string()),
            properties,
            managed,
            dependencies,
            declared,
        })
    }

    /// Load the parent. Missing or broken ancestors degrade to `None`; cycles fail.
    fn parent_model(
        &self,
        parent_ref: &ParentRef,
        location: Option<&Path>,
        chain: &[String],
    ) -> Result<Option<Rc<EffectiveModel>>> {
        let key = ArtifactKey::new(
            &parent_ref.group_id,
            &parent_ref.artifact_id,
            &parent_ref.version,
        );

        let loaded = match location.and_then(|pom_path| relative_parent(pom_path, parent_ref)) {
            Some((path, pom)) => {
                debug!(parent = %key, path = %path.display(), "using parent from relativePath");
                extend_chain(chain, &key.to_string())
                    .and_then(|next| self.build(&pom, Some(&path), &next))
                    .map(Rc::new)
            }
            None => self.load_artifact(&key, chain),
        };

        match loaded {
            Ok(model) => Ok(Some(model)),
            Err(e @ ResolveError::CyclicInheritance { .. }) => Err(e),
            Err(e) => {
                warn!(
                    parent = %key,
                    error = %e,
                    "parent descriptor unavailable, inherited values skipped"
                );
                Ok(None)
            }
        }
    }

    fn properties(
        &self,
        pom: &PomModel,
        parent: Option<&EffectiveModel>,
    ) -> BTreeMap<String, String> {
        let mut properties = parent.map(|p| p.properties.clone()).unwrap_or_default();
        properties.extend(pom.properties.iter().map(|(k, v)| (k.clone(), v.clone())));

        let group_id = pom.effective_group_id().unwrap_or(UNKNOWN).to_string();
        let version = pom.effective_version().unwrap_or(UNKNOWN).to_string();
        let packaging = pom.packaging.clone().unwrap_or_else(|| "jar".to_string());

        for prefix in ["project.", "pom."] {
            properties.insert(format!("{prefix}groupId"), group_id.clone());
            properties.insert(format!("{prefix}artifactId"), pom.artifact_id.clone());
            properties.insert(format!("{prefix}version"), version.clone());
        }
        properties.insert("project.packaging".to_string(), packaging);

        if let Some(parent_ref) = &pom.parent {
            for prefix in ["project.parent.", "parent."] {
                properties.insert(format!("{prefix}groupId"), parent_ref.group_id.clone());
                properties.insert(format!("{prefix}artifactId"), parent_ref.artifact_id.clone());
                properties.insert(format!("{prefix}version"), parent_ref.version.clone());
            }
        }

        properties
    }

    /// This level's management entries (explicit first, then imports in
    /// declaration order) laid over the ancestor's table.
    fn managed_table(
        &self,
        pom: &PomModel,
        parent: Option<&EffectiveModel>,
        properties: &BTreeMap<String, String>,
        chain: &[String],
    ) -> Result<BTreeMap<String, ManagedDependency>> {
        let mut level: BTreeMap<String, ManagedDependency> = BTreeMap::new();
        let mut imports: Vec<&DependencyDecl> = Vec::new();

        for decl in &pom.dependency_management {
            if decl.is_bom_import() {
                imports.push(decl);
                continue;
            }
            let group_id = interpolate_or_unknown(&decl.group_id, properties, &decl.artifact_id);
            let artifact_id =
                interpolate_or_unknown(&decl.artifact_id, properties, &decl.artifact_id);
            let coordinate = format!("{group_id}:{artifact_id}");
            let version = match &decl.version {
                Some(v) => interpolate_or_unknown(v, properties, &coordinate),
                None => UNKNOWN.to_string(),
            };
            level.entry(coordinate).or_insert_with(|| ManagedDependency {
                version,
                scope: decl.scope.as_deref().and_then(Scope::parse),
                exclusions: decl.exclusions.clone(),
            });
        }

        for decl in imports {
            let group_id = interpolate_or_unknown(&decl.group_id, properties, &decl.artifact_id);
            let artifact_id =
                interpolate_or_unknown(&decl.artifact_id, properties, &decl.artifact_id);
            let coordinate = format!("{group_id}:{artifact_id}");
            let version = match &decl.version {
                Some(v) => interpolate_or_unknown(v, properties, &coordinate),
                None => UNKNOWN.to_string(),
            };
            if version == UNKNOWN {
                warn!(bom = %coordinate, "BOM import without a resolvable version skipped");
                continue;
            }

            let key = ArtifactKey::new(&group_id, &artifact_id, &version);
            match self.load_artifact(&key, chain) {
                Ok(bom) => {
                    debug!(bom = %key, entries = bom.managed.len(), "merging imported BOM");
                    for (k, v) in &bom.managed {
                        level.entry(k.clone()).or_insert_with(|| v.clone());
                    }
                }
                Err(e @ ResolveError::CyclicInheritance { .. }) => return Err(e),
                Err(e) => warn!(
                    bom = %key,
                    error = %e,
                    "BOM import unavailable, its versions are skipped"
                ),
            }
        }

        let mut managed = parent.map(|p| p.managed.clone()).unwrap_or_default();
        managed.extend(level);
        Ok(managed)
    }
}

/// Own declarations resolved by precedence, followed by inherited ones.
fn resolve_dependencies(
    pom: &PomModel,
    parent: Option<&EffectiveModel>,
    managed: &BTreeMap<String, ManagedDependency>,
    properties: &BTreeMap<String, String>,
    owner: &ArtifactKey,
) -> (Vec<ResolvedDependency>, BTreeSet<String>) {
    let mut dependencies = Vec::new();
    let mut declared = BTreeSet::new();

    for decl in &pom.dependencies {
        let group_id = interpolate_or_unknown(&decl.group_id, properties, &decl.artifact_id);
        let artifact_id = interpolate_or_unknown(&decl.artifact_id, properties, &decl.artifact_id);
        let key = format!("{group_id}:{artifact_id}");

        if !declared.insert(key.clone()) {
            debug!(dependency = %key, owner = %owner, "duplicate declaration ignored");
            continue;
        }

        let entry = managed.get(&key);
        let version = match &decl.version {
            Some(v) => interpolate_or_unknown(v, properties, &key),
            None => entry
                .map(|m| m.version.clone())
                .filter(|v| v != UNKNOWN)
                .or_else(|| inherited_version(parent, &key))
                .unwrap_or_else(|| {
                    let err = ResolveError::UnresolvedVersion {
                        coordinate: key.clone(),
                        expression: "no version declared or managed".to_string(),
                    };
                    warn!(owner = %owner, error = %err, "dependency version unresolved");
                    UNKNOWN.to_string()
                }),
        };

        let scope = decl
            .scope
            .as_deref()
            .and_then(|s| interpolate(s, properties).ok())
            .and_then(|s| Scope::parse(&s))
            .or_else(|| entry.and_then(|m| m.scope))
            .unwrap_or(Scope::Compile);

        let mut exclusions: Vec<Exclusion> = decl
            .exclusions
            .iter()
            .map(|e| Exclusion {
                group_id: interpolate(&e.group_id, properties)
                    .unwrap_or_else(|_| e.group_id.clone()),
                artifact_id: interpolate(&e.artifact_id, properties)
                    .unwrap_or_else(|_| e.artifact_id.clone()),
            })
            .collect();
        if let Some(entry) = entry {
            exclusions.extend(entry.exclusions.iter().cloned());
        }

        dependencies.push(ResolvedDependency {
            group_id,
            artifact_id,
            version,
            scope,
            optional: decl.optional,
            exclusions,
        });
    }

    if let Some(parent) = parent {
        for inherited in &parent.dependencies {
            if !declared.contains(&inherited.key()) {
                dependencies.push(inherited.clone());
            }
        }
    }

    (dependencies, declared)
}

fn inherited_version(parent: Option<&EffectiveModel>, key: &str) -> Option<String> {
    parent?
        .dependencies
        .iter()
        .find(|d| d.key() == key && d.version != UNKNOWN)
        .map(|d| d.version.clone())
}

/// Parent descriptor found via `<relativePath>` whose coordinates match the reference.
fn relative_parent(pom_path: &Path, parent_ref: &ParentRef) -> Option<(PathBuf, PomModel)> {
    let relative = match parent_ref.relative_path.as_deref() {
        Some("") => return None,
        Some(rel) => rel,
        None => "../pom.xml",
    };

    let mut candidate = pom_path.parent()?.join(relative);
    if candidate.is_dir() {
        candidate = candidate.join("pom.xml");
    }
    if !candidate.is_file() {
        return None;
    }

    let pom = read_pom(&candidate).ok()?;
    let matches = pom.artifact_id == parent_ref.artifact_id
        && pom.effective_group_id() == Some(parent_ref.group_id.as_str())
        && pom.effective_version() == Some(parent_ref.version.as_str());

    if matches {
        Some((candidate, pom))
    } else {
        debug!(
            path = %candidate.display(),
            "relativePath descriptor does not match parent reference"
        );
        None
    }
}

fn raw_key(pom: &PomModel) -> String {
    format!(
        "{}:{}:{}",
        pom.effective_group_id().unwrap_or(UNKNOWN),
        pom.artifact_id,
        pom.effective_version().unwrap_or(UNKNOWN)
    )
}

fn extend_chain(chain: &[String], key: &str) -> Result<Vec<String>> {
    let mut next = chain.to_vec();
    next.push(key.to_string());
    if chain.iter().any(|k| k == key) {
        return Err(ResolveError::CyclicInheritance { chain: next });
    }
    Ok(next)
}

/// Expand `${name}` placeholders, repeatedly, from `properties`.
///
/// Returns the first placeholder left unresolved as the error.
pub fn interpolate(
    value: &str,
    properties: &BTreeMap<String, String>,
) -> std::result::Result<String, String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

    let mut current = value.to_string();
    for _ in 0..MAX_INTERPOLATION_PASSES {
        if !current.contains("${") {
            return Ok(current);
        }
        let mut changed = false;
        let next = re
            .replace_all(&current, |caps: &regex::Captures<'_>| match properties.get(&caps[1]) {
                Some(v) => {
                    changed = true;
                    v.clone()
                }
                None => caps[0].to_string(),
            })
            .into_owned();
        if !changed {
            break;
        }
        current = next;
    }

    match re.find(&current) {
        Some(m) => Err(m.as_str().to_string()),
        None => Ok(current),
    }
}

fn interpolate_or_unknown(
    value: &str,
    properties: &BTreeMap<String, String>,
    context: &str,
) -> String {
    if value.trim().is_empty() {
        return UNKNOWN.to_string();
    }
    match interpolate(value, properties) {
        Ok(v) if !v.trim().is_empty() => v,
        Ok(_) => UNKNOWN.to_string(),
        Err(expression) => {
            let err = ResolveError::UnresolvedVersion {
                coordinate: context.to_string(),
                expression,
            };
            warn!(error = %err, "placeholder left unresolved");
            UNKNOWN.to_string()
        }
    }
}
