//! Raw `pom.xml` model, parsed with the quick-xml event API.
//!
//! Values are kept exactly as written (placeholders included); interpolation
//! and inheritance happen in [`super::effective`].

use std::collections::BTreeMap;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{ResolveError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    /// `None` = default `../pom.xml`; `Some("")` = explicitly disabled.
    pub relative_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

impl Exclusion {
    /// Whether this exclusion matches `group:artifact`; `*` is a wildcard.
    pub fn matches(&self, group_id: &str, artifact_id: &str) -> bool {
        (self.group_id == "*" || self.group_id == group_id)
            && (self.artifact_id == "*" || self.artifact_id == artifact_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyDecl {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub dep_type: Option<String>,
    pub classifier: Option<String>,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
}

impl DependencyDecl {
    pub fn is_bom_import(&self) -> bool {
        self.scope.as_deref() == Some("import")
            && self.dep_type.as_deref().unwrap_or("jar") == "pom"
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PomModel {
    pub group_id: Option<String>,
    pub artifact_id: String,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<ParentRef>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<DependencyDecl>,
    pub dependency_management: Vec<DependencyDecl>,
}

impl PomModel {
    /// Own group id, falling back to the parent's.
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.group_id.as_str()))
    }

    /// Own version, falling back to the parent's.
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.version.as_str()))
    }
}

/// Read and parse a descriptor from disk.
pub fn read_pom(path: &Path) -> Result<PomModel> {
    let content = std::fs::read_to_string(path).map_err(|e| ResolveError::io(path, e))?;
    parse_pom(&content, path)
}

#[derive(Clone, Copy, PartialEq)]
enum DepList {
    Dependencies,
    Management,
}

/// Parse `pom.xml` content. `origin` is only used in error messages.
pub fn parse_pom(content: &str, origin: &Path) -> Result<PomModel> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let parse_error = |reason: String| ResolveError::DescriptorParse {
        path: origin.to_path_buf(),
        reason,
    };

    let mut model = PomModel::default();
    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut saw_project = false;

    let mut parent: Option<ParentRef> = None;
    let mut current_dep: Option<(DepList, DependencyDecl)> = None;
    let mut current_exclusion: Option<Exclusion> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                let p: Vec<&str> = path.iter().map(String::as_str).collect();

                match (p.as_slice(), name.as_str()) {
                    ([], "project") => saw_project = true,
                    (["project"], "parent") => parent = Some(ParentRef::default()),
                    (["project", "dependencies"], "dependency") => {
                        current_dep = Some((DepList::Dependencies, DependencyDecl::default()));
                    }
                    (["project", "dependencyManagement", "dependencies"], "dependency") => {
                        current_dep = Some((DepList::Management, DependencyDecl::default()));
                    }
                    ([.., "dependency", "exclusions"], "exclusion") if current_dep.is_some() => {
                        current_exclusion = Some(Exclusion::default());
                    }
                    _ => {}
                }

                path.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                if path.len() == 2
                    && path[0] == "project"
                    && path[1] == "parent"
                    && name == "relativePath"
                {
                    if let Some(parent) = parent.as_mut() {
                        parent.relative_path = Some(String::new());
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                path.pop();
                let p: Vec<&str> = path.iter().map(String::as_str).collect();

                match (p.as_slice(), name.as_str()) {
                    (["project"], "parent") => model.parent = parent.take(),
                    (["project", "dependencies"], "dependency")
                    | (["project", "dependencyManagement", "dependencies"], "dependency") => {
                        if let Some((list, dep)) = current_dep.take() {
                            if !dep.artifact_id.is_empty() {
                                match list {
                                    DepList::Dependencies => model.dependencies.push(dep),
                                    DepList::Management => model.dependency_management.push(dep),
                                }
                            }
                        }
                    }
                    ([.., "exclusions"], "exclusion") => {
                        if let (Some(exclusion), Some((_, dep))) =
                            (current_exclusion.take(), current_dep.as_mut())
                        {
                            dep.exclusions.push(exclusion);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| parse_error(err.to_string()))?
                    .trim()
                    .to_string();
                let p: Vec<&str> = path.iter().map(String::as_str).collect();

                match p.as_slice() {
                    ["project", "groupId"] => model.group_id = Some(text),
                    ["project", "artifactId"] => model.artifact_id = text,
                    ["project", "version"] => model.version = Some(text),
                    ["project", "packaging"] => model.packaging = Some(text),
                    ["project", "properties", key] => {
                        model.properties.insert((*key).to_string(), text);
                    }
                    ["project", "parent", field] => {
                        if let Some(parent) = parent.as_mut() {
                            match *field {
                                "groupId" => parent.group_id = text,
                                "artifactId" => parent.artifact_id = text,
                                "version" => parent.version = text,
                                "relativePath" => parent.relative_path = Some(text),
                                _ => {}
                            }
                        }
                    }
                    [.., "dependency", "exclusions", "exclusion", field] => {
                        if let Some(exclusion) = current_exclusion.as_mut() {
                            match *field {
                                "groupId" => exclusion.group_id = text,
                                "artifactId" => exclusion.artifact_id = text,
                                _ => {}
                            }
                        }
                    }
                    ["project", "dependencies", "dependency", field]
                    | ["project", "dependencyManagement", "dependencies", "dependency", field] => {
                        if let Some((_, dep)) = current_dep.as_mut() {
                            match *field {
                                "groupId" => dep.group_id = text,
                                "artifactId" => dep.artifact_id = text,
                                "version" => dep.version = Some(text),
                                "scope" => dep.scope = Some(text),
                                "type" => dep.dep_type = Some(text),
                                "classifier" => dep.classifier = Some(text),
                                "optional" => dep.optional = text.eq_ignore_ascii_case("true"),
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(parse_error(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !saw_project {
        return Err(parse_error("missing <project> root element".to_string()));
    }
    if model.artifact_id.is_empty() {
        return Err(parse_error("missing <artifactId>".to_string()));
    }
    if let Some(parent) = &model.parent {
        if parent.group_id.is_empty()
            || parent.artifact_id.is_empty()
            || parent.version.is_empty()
        {
            return Err(parse_error("incomplete <parent> reference".to_string()));
        }
    }

    Ok(model)
}
