//! POM descriptors.
//!
//! [`Pom`] is the document as written: versions may still be `${...}`
//! references and nothing is inherited. [`EffectivePom`] is what resolution
//! works with: the parent chain merged, imported BOMs folded into dependency
//! management, properties interpolated and managed versions applied.

use std::collections::BTreeMap;

use appc_schema::{AppDependency, ArtifactCoords, ArtifactKey, DEFAULT_TYPE, Scope};
use roxmltree::{Document, Node};

use super::RemoteRepository;
use crate::error::{AppCreatorError, Result};

/// Parent chains and BOM imports deeper than this are treated as cycles.
const MAX_DEPTH: usize = 32;

/// Passes of `${...}` substitution before giving up on nested references.
const MAX_INTERPOLATION_PASSES: usize = 16;

/// A `<exclusion>`; either part may be the `*` wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

impl Exclusion {
    pub fn matches(&self, group_id: &str, artifact_id: &str) -> bool {
        (self.group_id == "*" || self.group_id == group_id)
            && (self.artifact_id == "*" || self.artifact_id == artifact_id)
    }
}

/// A `<dependency>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub artifact_type: String,
    pub classifier: String,
    pub scope: Option<String>,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
}

impl PomDependency {
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            classifier: self.classifier.clone(),
            artifact_type: self.artifact_type.clone(),
        }
    }

    /// The declared scope, `compile` when absent.
    pub fn scope(&self) -> Result<Scope> {
        Ok(self.scope.as_deref().unwrap_or_default().parse()?)
    }

    /// Whether the version is a range such as `[1.0,2.0)`.
    pub fn has_version_range(&self) -> bool {
        self.version
            .as_deref()
            .is_some_and(|v| v.starts_with('[') || v.starts_with('('))
    }

    /// Coordinates of the artifact, failing when no version is known.
    pub fn coords(&self, declared_in: &ArtifactCoords) -> Result<ArtifactCoords> {
        let version = self.version.as_deref().ok_or_else(|| {
            AppCreatorError::resolution(
                declared_in,
                format!(
                    "dependency {}:{} has no version",
                    self.group_id, self.artifact_id
                ),
            )
        })?;
        Ok(ArtifactCoords::new(
            &self.group_id,
            &self.artifact_id,
            &self.classifier,
            &self.artifact_type,
            version,
        ))
    }

    pub fn to_app_dependency(&self, declared_in: &ArtifactCoords) -> Result<AppDependency> {
        Ok(AppDependency {
            artifact: self.coords(declared_in)?,
            scope: self.scope()?,
            optional: self.optional,
        })
    }

    fn interpolated(&self, props: &BTreeMap<String, String>) -> Self {
        Self {
            group_id: interpolate(&self.group_id, props),
            artifact_id: interpolate(&self.artifact_id, props),
            version: self.version.as_deref().map(|v| interpolate(v, props)),
            artifact_type: interpolate(&self.artifact_type, props),
            classifier: interpolate(&self.classifier, props),
            scope: self.scope.as_deref().map(|s| interpolate(s, props)),
            optional: self.optional,
            exclusions: self
                .exclusions
                .iter()
                .map(|e| Exclusion {
                    group_id: interpolate(&e.group_id, props),
                    artifact_id: interpolate(&e.artifact_id, props),
                })
                .collect(),
        }
    }

    fn is_bom_import(&self) -> bool {
        self.scope.as_deref() == Some("import") && self.artifact_type == "pom"
    }
}

/// A POM as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: String,
    pub version: Option<String>,
    pub packaging: String,
    /// Coordinates of the parent POM.
    pub parent: Option<ArtifactCoords>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<PomDependency>,
    pub dependency_management: Vec<PomDependency>,
    pub repositories: Vec<RemoteRepository>,
}

impl Pom {
    /// Parse a POM document. `source_name` only labels errors.
    pub fn parse(xml: &str, source_name: &str) -> Result<Self> {
        let doc = Document::parse(xml).map_err(|e| AppCreatorError::pom(source_name, e))?;
        let project = doc.root_element();
        if !project.has_tag_name("project") {
            return Err(AppCreatorError::pom(source_name, "root element is not <project>"));
        }

        let artifact_id = child_text(project, "artifactId")
            .ok_or_else(|| AppCreatorError::pom(source_name, "missing <artifactId>"))?;

        let parent = match child(project, "parent") {
            Some(node) => {
                let part = |name: &str| {
                    child_text(node, name).ok_or_else(|| {
                        AppCreatorError::pom(source_name, format!("<parent> is missing <{name}>"))
                    })
                };
                Some(ArtifactCoords::pom(
                    part("groupId")?,
                    part("artifactId")?,
                    part("version")?,
                ))
            }
            None => None,
        };

        let properties: BTreeMap<String, String> = child(project, "properties")
            .map(|node| {
                elements(node)
                    .map(|p| {
                        let value = p.text().map(str::trim).unwrap_or_default();
                        (p.tag_name().name().to_string(), value.to_string())
                    })
                    .collect()
            })
            .unwrap_or_default();

        let dependencies = parse_dependencies(child(project, "dependencies"), source_name)?;
        let dependency_management = parse_dependencies(
            child(project, "dependencyManagement").and_then(|dm| child(dm, "dependencies")),
            source_name,
        )?;

        let repositories: Vec<RemoteRepository> = child(project, "repositories")
            .map(|node| {
                elements(node)
                    .filter(|r| r.has_tag_name("repository"))
                    .filter_map(|r| {
                        let url = child_text(r, "url")?;
                        let id = child_text(r, "id").unwrap_or_else(|| url.clone());
                        Some(RemoteRepository::new(id, url))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            group_id: child_text(project, "groupId"),
            artifact_id,
            version: child_text(project, "version"),
            packaging: child_text(project, "packaging").unwrap_or_else(|| DEFAULT_TYPE.to_string()),
            parent,
            properties,
            dependencies,
            dependency_management,
            repositories,
        })
    }

    /// Declared groupId, falling back to the parent's.
    pub fn group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().map(ArtifactCoords::group_id))
    }

    /// Declared version, falling back to the parent's.
    pub fn version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().map(ArtifactCoords::version))
    }

    /// Properties this POM defines about itself (`project.*`, `pom.*`) plus
    /// its own `<properties>`. Inherited properties are not included.
    pub fn own_properties(&self) -> BTreeMap<String, String> {
        let mut props = self.properties.clone();
        insert_project_properties(
            &mut props,
            self.group_id().unwrap_or_default(),
            &self.artifact_id,
            self.version().unwrap_or_default(),
            &self.packaging,
            self.parent.as_ref(),
        );
        props
    }
}

/// Replace `${name}` references with values from `props`. Unknown references
/// are left as written.
///
/// ```
/// use std::collections::BTreeMap;
/// use appc_core::resolver::pom::interpolate;
///
/// let props = BTreeMap::from([
///     ("quarkus.version".to_string(), "${platform.version}".to_string()),
///     ("platform.version".to_string(), "3.2.0".to_string()),
/// ]);
/// assert_eq!(interpolate("${quarkus.version}", &props), "3.2.0");
/// assert_eq!(interpolate("${unknown}", &props), "${unknown}");
/// ```
pub fn interpolate(text: &str, props: &BTreeMap<String, String>) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_INTERPOLATION_PASSES {
        if !current.contains("${") {
            break;
        }
        let next = interpolate_once(&current, props);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn interpolate_once(text: &str, props: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match props.get(name) {
            Some(value) => out.push_str(value),
            None => {
                out.push_str("${");
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

fn insert_project_properties(
    props: &mut BTreeMap<String, String>,
    group_id: &str,
    artifact_id: &str,
    version: &str,
    packaging: &str,
    parent: Option<&ArtifactCoords>,
) {
    for prefix in ["project", "pom"] {
        props.insert(format!("{prefix}.groupId"), group_id.to_string());
        props.insert(format!("{prefix}.artifactId"), artifact_id.to_string());
        props.insert(format!("{prefix}.version"), version.to_string());
        props.insert(format!("{prefix}.packaging"), packaging.to_string());
        if let Some(parent) = parent {
            props.insert(format!("{prefix}.parent.groupId"), parent.group_id().to_string());
            props.insert(format!("{prefix}.parent.artifactId"), parent.artifact_id().to_string());
            props.insert(format!("{prefix}.parent.version"), parent.version().to_string());
        }
    }
}

/// A POM with inheritance, imports and interpolation applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePom {
    /// The project's own POM coordinates.
    pub coords: ArtifactCoords,
    pub packaging: String,
    pub properties: BTreeMap<String, String>,
    /// Declared and inherited dependencies, with managed versions and scopes
    /// filled in.
    pub dependencies: Vec<PomDependency>,
    pub management: BTreeMap<ArtifactKey, PomDependency>,
    pub repositories: Vec<RemoteRepository>,
}

impl EffectivePom {
    /// Build the effective model of `pom`. `load` fetches parent and BOM
    /// POMs by coordinates.
    pub fn build(pom: &Pom, load: &dyn Fn(&ArtifactCoords) -> Result<Pom>) -> Result<Self> {
        build_at(pom, load, 0)
    }

    /// The managed entry for `key`, if any.
    pub fn managed(&self, key: &ArtifactKey) -> Option<&PomDependency> {
        self.management.get(key)
    }
}

fn build_at(
    pom: &Pom,
    load: &dyn Fn(&ArtifactCoords) -> Result<Pom>,
    depth: usize,
) -> Result<EffectivePom> {
    let name = format!("{}:{}", pom.group_id().unwrap_or("?"), pom.artifact_id);
    if depth > MAX_DEPTH {
        return Err(AppCreatorError::pom(&name, "BOM imports nest too deeply"));
    }

    // Child first.
    let mut chain = vec![pom.clone()];
    let mut next_parent = pom.parent.clone();
    while let Some(parent) = next_parent {
        if chain.len() > MAX_DEPTH {
            return Err(AppCreatorError::pom(&name, "parent chain is too deep"));
        }
        let parent_pom = load(&parent)?;
        next_parent = parent_pom.parent.clone();
        chain.push(parent_pom);
    }

    let mut props = BTreeMap::new();
    for p in chain.iter().rev() {
        props.extend(p.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    let group_id = pom
        .group_id()
        .ok_or_else(|| AppCreatorError::pom(&name, "missing <groupId>"))?;
    let version = pom
        .version()
        .ok_or_else(|| AppCreatorError::pom(&name, "missing <version>"))?;
    let group_id = interpolate(group_id, &props);
    let version = interpolate(version, &props);
    insert_project_properties(
        &mut props,
        &group_id,
        &pom.artifact_id,
        &version,
        &pom.packaging,
        pom.parent.as_ref(),
    );

    let mut management = BTreeMap::new();
    for p in chain.iter().rev() {
        for managed in &p.dependency_management {
            let managed = managed.interpolated(&props);
            if !managed.is_bom_import() {
                management.insert(managed.key(), managed);
            }
        }
    }
    for p in &chain {
        for import in p.dependency_management.iter().filter(|d| d.is_bom_import()) {
            let import = import.interpolated(&props);
            let bom_coords = import.coords(&ArtifactCoords::pom(&group_id, &pom.artifact_id, &version))?;
            let bom = load(&bom_coords.pom_coords())?;
            let bom = build_at(&bom, load, depth + 1)?;
            for (key, managed) in bom.management {
                management.entry(key).or_insert(managed);
            }
        }
    }

    let mut dependencies: Vec<PomDependency> = Vec::new();
    for p in &chain {
        for dep in &p.dependencies {
            let mut dep = dep.interpolated(&props);
            if dependencies.iter().any(|d| d.key() == dep.key()) {
                continue;
            }
            if let Some(managed) = management.get(&dep.key()) {
                if dep.version.is_none() {
                    dep.version.clone_from(&managed.version);
                }
                if dep.scope.is_none() {
                    dep.scope.clone_from(&managed.scope);
                }
                if dep.exclusions.is_empty() {
                    dep.exclusions.clone_from(&managed.exclusions);
                }
            }
            dependencies.push(dep);
        }
    }

    let mut repositories: Vec<RemoteRepository> = Vec::new();
    for repo in chain.iter().flat_map(|p| &p.repositories) {
        let repo = RemoteRepository::new(interpolate(&repo.id, &props), interpolate(&repo.url, &props));
        if !repositories.iter().any(|r| r.url == repo.url) {
            repositories.push(repo);
        }
    }

    Ok(EffectivePom {
        coords: ArtifactCoords::pom(group_id, &pom.artifact_id, version),
        packaging: pom.packaging.clone(),
        properties: props,
        dependencies,
        management,
        repositories,
    })
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(name))
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn parse_dependencies(list: Option<Node<'_, '_>>, source_name: &str) -> Result<Vec<PomDependency>> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    elements(list)
        .filter(|d| d.has_tag_name("dependency"))
        .map(|d| parse_dependency(d, source_name))
        .collect()
}

fn parse_dependency(node: Node<'_, '_>, source_name: &str) -> Result<PomDependency> {
    let required = |name: &str| {
        child_text(node, name).ok_or_else(|| {
            AppCreatorError::pom(source_name, format!("<dependency> is missing <{name}>"))
        })
    };
    let exclusions = child(node, "exclusions")
        .map(|list| {
            elements(list)
                .filter(|e| e.has_tag_name("exclusion"))
                .filter_map(|e| {
                    Some(Exclusion {
                        group_id: child_text(e, "groupId")?,
                        artifact_id: child_text(e, "artifactId").unwrap_or_else(|| "*".to_string()),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(PomDependency {
        group_id: required("groupId")?,
        artifact_id: required("artifactId")?,
        version: child_text(node, "version"),
        artifact_type: child_text(node, "type").unwrap_or_else(|| DEFAULT_TYPE.to_string()),
        classifier: child_text(node, "classifier").unwrap_or_default(),
        scope: child_text(node, "scope"),
        optional: child_text(node, "optional").is_some_and(|o| o == "true"),
        exclusions,
    })
}
