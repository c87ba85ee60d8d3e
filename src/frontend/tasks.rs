// src/frontend/tasks.rs

//! The frontend task graph.
//!
//! ```text
//! install-node ─┬─> install-npm  ─┐
//!               ├─> install-pnpm ─┼─> install-frontend ─> clean / check / assemble / publish
//! resolve-pm ───┴─> install-yarn ─┘
//! ```

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::ConfigFile;
use crate::dag::TaskDescriptor;
use crate::distribution::{DistributionDescriptor, DistributionResolver, Platform, script_executable};
use crate::errors::{FrontdagError, Result};
use crate::exec::ScriptRunner;
use crate::frontend::actions::{
    InstallNodeAction, InstallPackageManagerAction, ResolvePackageManagerAction, RunScriptAction,
    resolved_package_manager,
};
use crate::frontend::manifest::PackageManifest;
use crate::frontend::package_manager::PackageManagerKind;
use crate::fs::FileSystem;
use crate::install::{DistributionFetcher, Installer};

pub const INSTALL_NODE: &str = "install-node";
pub const RESOLVE_PACKAGE_MANAGER: &str = "resolve-package-manager";
pub const INSTALL_FRONTEND: &str = "install-frontend";
pub const CLEAN_FRONTEND: &str = "clean-frontend";
pub const CHECK_FRONTEND: &str = "check-frontend";
pub const ASSEMBLE_FRONTEND: &str = "assemble-frontend";
pub const PUBLISH_FRONTEND: &str = "publish-frontend";

pub const PACKAGE_MANAGER_SPEC_FILE: &str = "package-manager-specification.txt";
pub const PACKAGE_MANAGER_EXECUTABLE_FILE: &str = "package-manager-executable-path.txt";

/// External services the task actions run through.
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub fs: Arc<dyn FileSystem>,
    pub fetcher: Arc<dyn DistributionFetcher>,
    pub runner: Arc<dyn ScriptRunner>,
}

/// Paths and settings shared by every task of one project.
struct Layout<'a> {
    config: &'a ConfigFile,
    platform: Platform,
    descriptor: DistributionDescriptor,
    node_directory: PathBuf,
    spec_file: PathBuf,
    executable_path_file: PathBuf,
    manifest_path: PathBuf,
    environment: BTreeMap<String, String>,
}

/// Build every frontend task for `config` on `platform`.
///
/// Distribution resolution and script gating happen here, so configuration
/// problems surface before any task runs.
pub fn frontend_tasks(
    config: &ConfigFile,
    platform: Platform,
    collaborators: &Collaborators,
) -> Result<Vec<TaskDescriptor>> {
    let resolver = DistributionResolver::new(
        &config.node.distribution_url_root,
        &config.node.distribution_url_path_pattern,
    )?;
    let descriptor = resolver.resolve(&config.node.version.to_string(), platform)?;
    let node_directory = config.node_directory().to_path_buf();
    let cache = &config.project.cache_directory;

    let layout = Layout {
        config,
        platform,
        environment: script_environment(config, &node_directory.join(descriptor.executable_dir()))?,
        descriptor,
        node_directory,
        spec_file: cache.join(PACKAGE_MANAGER_SPEC_FILE),
        executable_path_file: cache.join(PACKAGE_MANAGER_EXECUTABLE_FILE),
        manifest_path: config.manifest_path(),
    };
    let manifest = PackageManifest::read(collaborators.fs.as_ref(), &layout.manifest_path)?;
    let installer = Installer::new(collaborators.fs.clone(), collaborators.fetcher.clone());

    let mut tasks = vec![
        install_node_task(&layout, &installer),
        resolve_package_manager_task(&layout, collaborators),
    ];
    for kind in PackageManagerKind::ALL {
        tasks.push(install_package_manager_task(&layout, kind, &installer, collaborators));
    }
    tasks.push(install_frontend_task(&layout, collaborators));

    let scripts = &config.scripts;
    for (name, script) in [
        (CLEAN_FRONTEND, &scripts.clean),
        (CHECK_FRONTEND, &scripts.check),
        (ASSEMBLE_FRONTEND, &scripts.assemble),
        (PUBLISH_FRONTEND, &scripts.publish),
    ] {
        tasks.push(script_task(&layout, name, script.as_deref(), manifest.as_ref(), collaborators));
    }

    debug!(count = tasks.len(), "frontend tasks registered");
    Ok(tasks)
}

fn install_node_task(layout: &Layout<'_>, installer: &Installer) -> TaskDescriptor {
    let node = &layout.config.node;
    let target = node.install_directory.clone();

    let mut builder = TaskDescriptor::builder(INSTALL_NODE)
        .property("version", layout.descriptor.version.to_string())
        .property("platform", layout.platform.classifier())
        .property("url", layout.descriptor.url.to_string())
        .property(
            "distribution_path",
            node.distribution_path.as_ref().map(|p| p.display().to_string()),
        );
    // npm and npx are left out: corepack rewrites them in place.
    for executable in layout.descriptor.runtime_executables() {
        builder = builder.output_file(target.join(executable));
    }

    let source = if node.distribution_provided {
        None
    } else {
        node.distribution_path.clone()
    };
    builder = builder.action(InstallNodeAction {
        installer: installer.clone(),
        descriptor: layout.descriptor.clone(),
        target,
        source,
    });

    if node.distribution_provided {
        builder = builder.disabled("Node.js distribution is provided");
    }
    builder.build()
}

fn resolve_package_manager_task(layout: &Layout<'_>, collaborators: &Collaborators) -> TaskDescriptor {
    TaskDescriptor::builder(RESOLVE_PACKAGE_MANAGER)
        .input_file(&layout.manifest_path)
        .property("node_directory", layout.node_directory.display().to_string())
        .property("platform", layout.platform.classifier())
        .output_file(&layout.spec_file)
        .output_file(&layout.executable_path_file)
        .only_if("package.json exists", manifest_exists(layout, collaborators))
        .action(ResolvePackageManagerAction {
            fs: collaborators.fs.clone(),
            manifest: layout.manifest_path.clone(),
            node_directory: layout.node_directory.clone(),
            platform: layout.platform,
            spec_file: layout.spec_file.clone(),
            executable_path_file: layout.executable_path_file.clone(),
        })
        .build()
}

fn install_package_manager_task(
    layout: &Layout<'_>,
    kind: PackageManagerKind,
    installer: &Installer,
    collaborators: &Collaborators,
) -> TaskDescriptor {
    let name = kind.install_task_name();
    let corepack = layout.node_directory.join(layout.descriptor.corepack_executable());

    let has_manifest = manifest_exists(layout, collaborators);
    let fs = collaborators.fs.clone();
    let spec_file = layout.spec_file.clone();
    let selected = move || has_manifest() && resolved_package_manager(fs.as_ref(), &spec_file) == Some(kind);

    let mut builder = TaskDescriptor::builder(name.clone())
        .after(INSTALL_NODE)
        .after(RESOLVE_PACKAGE_MANAGER)
        .optional_input_file(corepack)
        .property("package_manager", kind.executable_name())
        .property("node_directory", layout.node_directory.display().to_string());
    for shim in kind.shim_names() {
        builder = builder.output_file(layout.node_directory.join(script_executable(layout.platform, shim)));
    }

    builder
        .only_if(format!("package.json exists and selects {kind}"), selected)
        .action(InstallPackageManagerAction {
            task: name,
            kind,
            installer: installer.clone(),
            descriptor: layout.descriptor.clone(),
            node_directory: layout.node_directory.clone(),
            project_directory: layout.config.project.directory.clone(),
            environment: layout.environment.clone(),
            runner: collaborators.runner.clone(),
        })
        .build()
}

fn install_frontend_task(layout: &Layout<'_>, collaborators: &Collaborators) -> TaskDescriptor {
    let project = &layout.config.project.directory;
    let args: Vec<String> = match &layout.config.scripts.install {
        Some(args) => args.clone(),
        None => PackageManagerKind::Npm
            .default_install_args()
            .iter()
            .map(|a| a.to_string())
            .collect(),
    };

    let mut builder = TaskDescriptor::builder(INSTALL_FRONTEND);
    for kind in PackageManagerKind::ALL {
        builder = builder
            .after(kind.install_task_name())
            .optional_input_file(project.join(kind.lock_file()));
    }

    builder
        .input_file(&layout.manifest_path)
        .input_file(&layout.spec_file)
        .property("install_script", args.clone())
        .output_dir(project.join("node_modules"))
        .only_if("package.json exists", manifest_exists(layout, collaborators))
        .action(run_script_action(layout, INSTALL_FRONTEND, args, collaborators))
        .build()
}

fn script_task(
    layout: &Layout<'_>,
    name: &str,
    script: Option<&[String]>,
    manifest: Option<&PackageManifest>,
    collaborators: &Collaborators,
) -> TaskDescriptor {
    let builder = TaskDescriptor::builder(name).after(INSTALL_FRONTEND);

    let Some(args) = script else {
        return builder.disabled("no script configured").build();
    };
    let Some(manifest) = manifest else {
        return builder.disabled("package.json not found").build();
    };
    if let [run, script_name, ..] = args {
        if run == "run" && !manifest.declares_script(script_name) {
            return builder
                .disabled(format!("package.json declares no '{script_name}' script"))
                .build();
        }
    }

    builder
        .property("script", args.to_vec())
        .action(run_script_action(layout, name, args.to_vec(), collaborators))
        .build()
}

fn run_script_action(
    layout: &Layout<'_>,
    task: &str,
    args: Vec<String>,
    collaborators: &Collaborators,
) -> RunScriptAction {
    RunScriptAction {
        task: task.to_string(),
        fs: collaborators.fs.clone(),
        executable_path_file: layout.executable_path_file.clone(),
        args,
        project_directory: layout.config.project.directory.clone(),
        environment: layout.environment.clone(),
        runner: collaborators.runner.clone(),
    }
}

fn manifest_exists(layout: &Layout<'_>, collaborators: &Collaborators) -> impl Fn() -> bool + Send + Sync + 'static {
    let fs = collaborators.fs.clone();
    let manifest = layout.manifest_path.clone();
    move || fs.is_file(&manifest)
}

/// Variables for every script: `PATH` led by the Node.js executables, then
/// the configured overrides.
fn script_environment(config: &ConfigFile, node_bin: &Path) -> Result<BTreeMap<String, String>> {
    let mut paths = vec![node_bin.to_path_buf()];
    if let Some(existing) = std::env::var_os("PATH") {
        paths.extend(std::env::split_paths(&existing));
    }
    let joined: OsString = std::env::join_paths(paths)
        .map_err(|e| FrontdagError::ConfigError(format!("cannot build PATH: {e}")))?;
    let joined = joined
        .into_string()
        .map_err(|_| FrontdagError::ConfigError("PATH is not valid UTF-8".to_string()))?;

    let mut environment = BTreeMap::from([("PATH".to_string(), joined)]);
    environment.extend(config.environment.iter().map(|(k, v)| (k.clone(), v.clone())));
    Ok(environment)
}
