// ─── Legacy Compatibility ───
// Pre-1.6 clients take identity and route as positional arguments and read
// their data from a hardcoded directory under the user's home. The shim picks
// a mode once per launch and rewrites the plan accordingly.
//
//   version.rs     effective version and mode classification
//   args.rs        modern/legacy argument rewriting
//   home.rs        per-instance compatibility home
//   projection.rs  link-or-mirror projection strategies
//   deobf.rs       loader dependency-data placement

pub mod args;
pub mod deobf;
pub mod home;
pub mod projection;
pub mod version;

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::InstanceLayout;
use crate::core::manifest::{ManifestModel, RouteSpec};
use crate::core::settings::LaunchSettings;

use self::args::{apply_legacy_game_args, apply_legacy_jvm_args, apply_modern_args, FML_TWEAKER};
use self::deobf::ensure_deobf_data;
use self::home::{CompatHome, PROJECTED_ARCHIVE, PROJECTED_DIRS};
use self::projection::{is_symlink, Projector};
use self::version::{classify, effective_version};
use super::archive::classpath_contains_class;
use super::plan::{CompatMode, LaunchPlan};

/// Entry classes that read from the home-relative game directory.
pub const LEGACY_HOME_ENTRY_CLASSES: &[&str] = &[
    "net.minecraft.client.Minecraft",
    "net.minecraft.launchwrapper.Launch",
];

pub struct LegacyCompatibilityShim<'a> {
    settings: &'a LaunchSettings,
    projector: Projector,
}

impl<'a> LegacyCompatibilityShim<'a> {
    pub fn new(settings: &'a LaunchSettings) -> Self {
        Self {
            settings,
            projector: Projector::default(),
        }
    }

    pub fn with_projector(mut self, projector: Projector) -> Self {
        self.projector = projector;
        self
    }

    /// Rewrite `plan` for the mode its version calls for and return that mode.
    #[instrument(skip_all, fields(entry = %plan.entry_class))]
    pub fn apply(
        &self,
        plan: &mut LaunchPlan,
        manifest: &ManifestModel,
        route: &RouteSpec,
    ) -> LauncherResult<CompatMode> {
        let account = &self.settings.account;
        let version = effective_version(manifest, route, &plan.instance_dir);
        let mode = classify(&version);
        debug!("Effective version {} -> {:?}", version, mode);

        if mode == CompatMode::Modern {
            apply_modern_args(&mut plan.game_args, account, route);
            plan.mode = CompatMode::Modern;
            return Ok(CompatMode::Modern);
        }

        if !LEGACY_HOME_ENTRY_CLASSES.contains(&plan.entry_class.as_str()) {
            let note = format!(
                "version {} is legacy but entry class {} expects modern arguments",
                version, plan.entry_class
            );
            info!("{}", note);
            plan.note(note);
            apply_modern_args(&mut plan.game_args, account, route);
            plan.mode = CompatMode::Modern;
            return Ok(CompatMode::Modern);
        }

        let home = CompatHome::for_instance(&self.settings.compat_root(), &plan.instance_dir);
        info!("Legacy mode for {}; home {:?}", version, home.root);
        std::fs::create_dir_all(&home.game_dir)
            .map_err(|source| LauncherError::io(&home.game_dir, source))?;

        self.project_instance(plan, &home);
        ensure_deobf_data(&plan.instance_dir, &home.game_dir, &version)?;

        let tweak_available = classpath_contains_class(&plan.classpath, FML_TWEAKER);
        apply_legacy_game_args(&mut plan.game_args, account, route, &version, tweak_available);
        let natives = InstanceLayout::new(&plan.instance_dir).natives_dir();
        apply_legacy_jvm_args(&mut plan.jvm_args, &natives, &home.root);

        plan.env.extend(home.env());
        plan.mode = CompatMode::Legacy;
        Ok(CompatMode::Legacy)
    }

    /// Project instance content into the home's game directory. Failures
    /// degrade to warnings.
    fn project_instance(&self, plan: &LaunchPlan, home: &CompatHome) {
        for dir in PROJECTED_DIRS {
            let source = plan.instance_dir.join(dir);
            let target = home.game_dir.join(dir);
            if source.exists() {
                self.project_one(&source, &target);
            } else if is_symlink(&target) {
                // Link left behind by a previous launch whose source is gone.
                if let Err(err) = std::fs::remove_file(&target) {
                    debug!("Could not remove orphaned link {:?}: {}", target, err);
                }
            }
        }

        match &plan.game_archive {
            Some(archive) if archive.is_file() => {
                self.project_one(archive, &home.game_dir.join(PROJECTED_ARCHIVE));
            }
            _ => debug!("No game archive to project into the compatibility home"),
        }
    }

    fn project_one(&self, source: &Path, target: &Path) {
        if let Err(failures) = self.projector.project(source, target) {
            warn!(
                "Could not project {:?} into the compatibility home: {}",
                source,
                failures.join("; ")
            );
        }
    }
}
