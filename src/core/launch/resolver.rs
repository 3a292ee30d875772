// ─── Launch Plan Resolver ───
// Decides what to run: an explicit entry class over a classpath, or a single
// runnable archive. Archive selection is an ordered list of strategies; each
// returns a selection or the reasons it rejected its candidates.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::archive::{classpath_contains_class, inspect_archive, ArchiveStatus};
use super::arguments::{substitute_game_args, substitute_jvm_args, PlaceholderContext};
use super::candidates::collect_candidates;
use super::classpath::{dedup_preserving_order, expand_classpath};
use super::plan::{CompatMode, Invocation, LaunchPlan};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::{resolve_inside, InstanceLayout};
use crate::core::manifest::{LaunchMode, ManifestModel, RouteSpec};
use crate::core::settings::LaunchSettings;

/// Entry classes used by common loaders, tried in this order when the
/// declared class is missing.
pub const WELL_KNOWN_ENTRY_CLASSES: &[&str] = &[
    "net.minecraft.launchwrapper.Launch",
    "cpw.mods.bootstraplauncher.BootstrapLauncher",
    "net.fabricmc.loader.impl.launch.knot.KnotClient",
    "net.fabricmc.loader.launch.knot.KnotClient",
    "org.quiltmc.loader.impl.launch.knot.KnotClient",
    "net.minecraftforge.bootstrap.ForgeBootstrap",
    "net.minecraft.client.main.Main",
    "net.minecraft.client.Minecraft",
];

/// Patterns making up the implicit classpath around a game archive.
const IMPLICIT_CLASSPATH: &[&str] = &["libraries/**/*.jar", "*.jar"];

const DEFAULT_RUNTIME: &str = "java";

#[instrument(skip_all, fields(profile = %manifest.profile_id, mode = ?manifest.launch_mode))]
pub fn resolve(
    manifest: &ManifestModel,
    route: &RouteSpec,
    instance_dir: &Path,
    settings: &LaunchSettings,
) -> LauncherResult<LaunchPlan> {
    let layout = InstanceLayout::new(instance_dir);
    let root = layout.root();
    let runtime = runtime_executable(manifest, root, settings)?;

    let preferred = match route.preferred_archive() {
        Some(relative) => Some(PreferredArchive::inspect(root, relative)?),
        None => None,
    };

    let mut notes = Vec::new();
    let target = match manifest.launch_mode {
        LaunchMode::ExplicitClass => {
            resolve_explicit_class(manifest, root, preferred.as_ref(), &mut notes)?
        }
        LaunchMode::Archive => resolve_archive(manifest, root, preferred.as_ref(), &mut notes)?,
    };

    let version_name = route
        .version()
        .or(manifest.declared_version())
        .unwrap_or(manifest.profile_id.as_str())
        .to_string();
    let natives = layout.natives_dir();
    let ctx = PlaceholderContext {
        account: &settings.account,
        game_directory: root,
        natives_directory: &natives,
        version_name: &version_name,
    };

    info!(
        "Resolved {:?} entry {} with {} classpath entries",
        manifest.launch_mode,
        target.entry_class,
        target.classpath.len()
    );

    Ok(LaunchPlan {
        runtime,
        instance_dir: root.to_path_buf(),
        jvm_args: substitute_jvm_args(&manifest.jvm_args, &ctx),
        classpath: target.classpath,
        invocation: target.invocation,
        entry_class: target.entry_class,
        game_archive: target.game_archive,
        game_args: substitute_game_args(&manifest.game_args, &ctx),
        env: BTreeMap::new(),
        mode: CompatMode::Modern,
        notes,
    })
}

/// Manifest runtime (inside the instance), else the configured path, else
/// `java` from `PATH`.
pub fn runtime_executable(
    manifest: &ManifestModel,
    root: &Path,
    settings: &LaunchSettings,
) -> LauncherResult<PathBuf> {
    if let Some(requirement) = &manifest.runtime {
        return resolve_inside(root, &requirement.path);
    }
    if let Some(path) = settings.java_path.as_ref().filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path.clone());
    }
    Ok(PathBuf::from(DEFAULT_RUNTIME))
}

struct ResolvedTarget {
    invocation: Invocation,
    entry_class: String,
    classpath: Vec<PathBuf>,
    game_archive: Option<PathBuf>,
}

// ── Explicit class ──────────────────────────────────

fn resolve_explicit_class(
    manifest: &ManifestModel,
    root: &Path,
    preferred: Option<&PreferredArchive>,
    notes: &mut Vec<String>,
) -> LauncherResult<ResolvedTarget> {
    let mut classpath = expand_classpath(root, &manifest.classpath)?;
    if let Some(preferred) = preferred.filter(|p| p.status.is_some()) {
        classpath.push(preferred.path.clone());
        dedup_preserving_order(&mut classpath);
    }

    let entry = discover_entry_class(&classpath, manifest.main_class.as_deref())
        .map_err(|reason| LauncherError::launch_configuration("no entry class found", vec![reason]))?;
    if let Some(note) = entry.note() {
        warn!("{}", note);
        notes.push(note);
    }

    let game_archive = match preferred.filter(|p| p.status.is_some()) {
        Some(preferred) => Some(preferred.path.clone()),
        None => collect_candidates(root, manifest, None, None)?
            .into_iter()
            .map(|c| c.path)
            .find(|path| classpath.contains(path)),
    };

    Ok(ResolvedTarget {
        invocation: Invocation::MainClass(entry.class.clone()),
        entry_class: entry.class,
        classpath,
        game_archive,
    })
}

/// Entry class found on a classpath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredEntry {
    pub class: String,
    /// The declared class that was missing, when a fallback was used.
    pub replaced: Option<String>,
}

impl DiscoveredEntry {
    fn note(&self) -> Option<String> {
        self.replaced.as_ref().map(|declared| {
            format!(
                "entry class {} not on classpath; using {}",
                declared, self.class
            )
        })
    }
}

/// Find the declared entry class, or the first well-known one, by reading
/// classpath archive listings.
pub fn discover_entry_class(
    classpath: &[PathBuf],
    declared: Option<&str>,
) -> Result<DiscoveredEntry, String> {
    let declared = declared.map(str::trim).filter(|c| !c.is_empty());

    if let Some(declared) = declared {
        if classpath_contains_class(classpath, declared) {
            return Ok(DiscoveredEntry {
                class: declared.to_string(),
                replaced: None,
            });
        }
    }

    for candidate in WELL_KNOWN_ENTRY_CLASSES {
        if classpath_contains_class(classpath, candidate) {
            return Ok(DiscoveredEntry {
                class: candidate.to_string(),
                replaced: declared.map(str::to_string),
            });
        }
    }

    Err(match declared {
        Some(declared) => format!(
            "{} and no known entry class found in {} classpath entries",
            declared,
            classpath.len()
        ),
        None => format!(
            "no known entry class found in {} classpath entries",
            classpath.len()
        ),
    })
}

// ── Archive ─────────────────────────────────────────

/// The route's preferred archive and what was found at its path.
struct PreferredArchive {
    relative: String,
    path: PathBuf,
    name: String,
    /// `None` when nothing exists at the path.
    status: Option<ArchiveStatus>,
}

impl PreferredArchive {
    fn inspect(root: &Path, relative: &str) -> LauncherResult<Self> {
        let path = resolve_inside(root, relative)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let status = path.exists().then(|| inspect_archive(&path));
        Ok(Self {
            relative: relative.to_string(),
            path,
            name,
            status,
        })
    }
}

struct ArchiveContext<'a> {
    root: &'a Path,
    manifest: &'a ManifestModel,
    preferred: Option<&'a PreferredArchive>,
}

trait ArchiveStrategy {
    fn name(&self) -> &'static str;
    fn select(&self, ctx: &ArchiveContext<'_>) -> Result<ResolvedTarget, Vec<String>>;
}

/// (a) The preferred archive, when it is runnable as-is.
struct PreferredArchiveStrategy;

impl ArchiveStrategy for PreferredArchiveStrategy {
    fn name(&self) -> &'static str {
        "preferred"
    }

    fn select(&self, ctx: &ArchiveContext<'_>) -> Result<ResolvedTarget, Vec<String>> {
        let Some(preferred) = ctx.preferred else {
            return Err(Vec::new());
        };
        match &preferred.status {
            Some(ArchiveStatus::Runnable { main_class }) => Ok(ResolvedTarget {
                invocation: Invocation::Archive(preferred.path.clone()),
                entry_class: main_class.clone(),
                classpath: vec![preferred.path.clone()],
                game_archive: Some(preferred.path.clone()),
            }),
            Some(ArchiveStatus::Readable) => Err(vec![format!(
                "{}: no Main-Class attribute",
                preferred.relative
            )]),
            Some(ArchiveStatus::Invalid(reason)) => {
                Err(vec![format!("{}: {}", preferred.relative, reason)])
            }
            None => Err(vec![format!("{}: not found", preferred.relative)]),
        }
    }
}

/// (b)/(c) Best-scoring alternative, with entry-class discovery for archives
/// that declare no entry point.
struct ScoredCandidateStrategy;

impl ArchiveStrategy for ScoredCandidateStrategy {
    fn name(&self) -> &'static str {
        "scored"
    }

    fn select(&self, ctx: &ArchiveContext<'_>) -> Result<ResolvedTarget, Vec<String>> {
        // A preferred file that exists but cannot run as-is is never reconsidered.
        let excluded = ctx
            .preferred
            .filter(|p| p.status.as_ref().is_some_and(|s| !s.is_runnable()))
            .map(|p| p.path.as_path());
        let preferred_name = ctx.preferred.map(|p| p.name.as_str());

        let candidates = collect_candidates(ctx.root, ctx.manifest, preferred_name, excluded)
            .map_err(|err| vec![err.to_string()])?;
        if candidates.is_empty() {
            return Err(vec!["no candidate archives in the instance".into()]);
        }

        let mut reasons = Vec::new();
        for candidate in candidates {
            debug!("Candidate {} (score {})", candidate.relative, candidate.score);
            match inspect_archive(&candidate.path) {
                ArchiveStatus::Runnable { main_class } => {
                    return Ok(ResolvedTarget {
                        invocation: Invocation::Archive(candidate.path.clone()),
                        entry_class: main_class,
                        classpath: vec![candidate.path.clone()],
                        game_archive: Some(candidate.path),
                    });
                }
                ArchiveStatus::Readable => {
                    let classpath = implicit_classpath(ctx.root, &candidate.path)
                        .map_err(|err| vec![err.to_string()])?;
                    match discover_entry_class(&classpath, None) {
                        Ok(entry) => {
                            return Ok(ResolvedTarget {
                                invocation: Invocation::MainClass(entry.class.clone()),
                                entry_class: entry.class,
                                classpath,
                                game_archive: Some(candidate.path),
                            });
                        }
                        Err(reason) => reasons.push(format!(
                            "{}: no Main-Class attribute and {}",
                            candidate.relative, reason
                        )),
                    }
                }
                ArchiveStatus::Invalid(reason) => {
                    reasons.push(format!("{}: {}", candidate.relative, reason));
                }
            }
        }
        Err(reasons)
    }
}

fn resolve_archive(
    manifest: &ManifestModel,
    root: &Path,
    preferred: Option<&PreferredArchive>,
    notes: &mut Vec<String>,
) -> LauncherResult<ResolvedTarget> {
    let ctx = ArchiveContext {
        root,
        manifest,
        preferred,
    };
    let strategies: [&dyn ArchiveStrategy; 2] = [&PreferredArchiveStrategy, &ScoredCandidateStrategy];

    let mut reasons = Vec::new();
    for strategy in strategies {
        match strategy.select(&ctx) {
            Ok(target) => {
                if !reasons.is_empty() {
                    let chosen = match &target.game_archive {
                        Some(path) => path.display().to_string(),
                        None => target.entry_class.clone(),
                    };
                    let note = format!("{}; using {}", reasons.join("; "), chosen);
                    warn!("Archive substituted: {}", note);
                    notes.push(note);
                }
                debug!("Archive strategy {} succeeded", strategy.name());
                return Ok(target);
            }
            Err(rejected) => {
                debug!("Archive strategy {} rejected: {:?}", strategy.name(), rejected);
                reasons.extend(rejected);
            }
        }
    }

    Err(LauncherError::launch_configuration(
        "no runnable archive found",
        most_informative(reasons),
    ))
}

/// Candidate-specific reasons first; generic ones only fill the gaps.
fn most_informative(mut reasons: Vec<String>) -> Vec<String> {
    reasons.sort_by_key(|reason| !reason.contains(':'));
    reasons
}

/// The archive, every archive under `libraries/`, every archive in the root.
fn implicit_classpath(root: &Path, archive: &Path) -> LauncherResult<Vec<PathBuf>> {
    let patterns: Vec<String> = IMPLICIT_CLASSPATH.iter().map(|p| p.to_string()).collect();
    let mut classpath = vec![archive.to_path_buf()];
    classpath.extend(expand_classpath(root, &patterns)?);
    dedup_preserving_order(&mut classpath);
    Ok(classpath)
}
