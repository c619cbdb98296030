//! The install / launch / update sequences.
//!
//! Each action is a fixed list of external commands run one after another. The
//! first failure ends the action and is returned to the caller; earlier side
//! effects stay on disk. Commands receive their working directory explicitly, so
//! the launcher process itself never changes directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::launcher::browser::{self, Browser};
use crate::launcher::error::{CommandError, LauncherError};
use crate::launcher::manifest::{self, InstallManifest, InstallState};
use crate::launcher::preview::PreviewServer;
use crate::launcher::progress::{LogLevel, Reporter};
use crate::launcher::shell::{Interrupt, Invocation, Shell};
use crate::model::config::LauncherConfig;
use crate::model::menu::Action;

const VCS_PROGRAM: &str = "git";

#[derive(Clone)]
pub struct Workflow {
    config: Arc<LauncherConfig>,
    shell: Arc<dyn Shell>,
    browser: Arc<dyn Browser>,
    base_dir: PathBuf,
    install_dir: PathBuf,
    interrupt: Interrupt,
}

impl Workflow {
    /// `base_dir` is where the clone runs; relative install dirs resolve against it.
    pub fn new(
        config: LauncherConfig,
        shell: Arc<dyn Shell>,
        browser: Arc<dyn Browser>,
        base_dir: PathBuf,
    ) -> Result<Self> {
        let install_dir = config.install_path(&base_dir)?;

        Ok(Self {
            config: Arc::new(config),
            shell,
            browser,
            base_dir,
            install_dir,
            interrupt: Interrupt::default(),
        })
    }

    /// A copy whose commands and preview wait stop once `interrupt` is triggered.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn is_installed(&self) -> bool {
        manifest::is_installed(&self.install_dir)
    }

    pub fn install_state(&self) -> InstallState {
        manifest::read_state(&self.install_dir)
    }

    /// Run `action` to completion. Launch and Update hand back the running preview server.
    pub fn run(
        &self,
        action: Action,
        reporter: &dyn Reporter,
    ) -> Result<Option<PreviewServer>, LauncherError> {
        tracing::info!("starting action {}", action.label());

        let result = match action {
            Action::Install => self.install(reporter).map(|()| None),
            Action::Launch => self.launch(reporter).map(Some),
            Action::Update => self.update(reporter).map(Some),
        };

        match &result {
            Ok(_) => tracing::info!("action {} completed", action.label()),
            Err(err) => tracing::error!("action {} aborted: {err}", action.label()),
        }

        result
    }

    pub fn install(&self, reporter: &dyn Reporter) -> Result<(), LauncherError> {
        let app = &self.config.general.app_name;
        let repo_url = &self.config.source.repo_url;
        let toolchain = &self.config.toolchain;

        reporter.log(
            LogLevel::Info,
            format!("Downloading and installing {app}..."),
        );

        let clone = Invocation::new(VCS_PROGRAM, &self.base_dir)
            .arg("clone")
            .arg(repo_url.as_str())
            .arg(self.install_dir.to_string_lossy());
        self.run_with_spinner(
            reporter,
            &format!("Cloning {} repository...", repo_slug(repo_url)),
            &clone,
        )
        .map_err(|err| LauncherError::command("cloning repository", err))?;

        manifest::write_manifest(
            &self.install_dir,
            &InstallManifest::new(&self.config.general.app_version, repo_url, false),
        )?;

        if self.shell.lookup(&toolchain.runtime).is_none() {
            return Err(LauncherError::MissingRuntime {
                runtime: toolchain.runtime_label.clone(),
            });
        }

        let package_manager = &toolchain.package_manager;
        if toolchain.reuse_existing_package_manager && self.shell.lookup(package_manager).is_some()
        {
            reporter.log(
                LogLevel::Info,
                format!("{package_manager} is already installed, skipping global install."),
            );
        } else {
            let bootstrap = Invocation::from_argv(&self.config.commands.bootstrap, &self.install_dir);
            self.run_with_spinner(reporter, &format!("Installing {package_manager}..."), &bootstrap)
                .map_err(|err| LauncherError::command(format!("installing {package_manager}"), err))?;
        }

        let dependencies =
            Invocation::from_argv(&self.config.commands.dependencies, &self.install_dir);
        self.run_with_spinner(
            reporter,
            &format!("Installing dependencies with {package_manager}..."),
            &dependencies,
        )
        .map_err(|err| LauncherError::command("installing dependencies", err))?;

        manifest::write_manifest(
            &self.install_dir,
            &InstallManifest::new(&self.config.general.app_version, repo_url, true),
        )?;

        reporter.log(
            LogLevel::Ok,
            format!("{app} has been downloaded and installed successfully."),
        );
        Ok(())
    }

    pub fn launch(&self, reporter: &dyn Reporter) -> Result<PreviewServer, LauncherError> {
        let app = &self.config.general.app_name;
        self.require_installed()?;

        if let InstallState::Incomplete(_) = self.install_state() {
            reporter.log(
                LogLevel::Warn,
                format!("The {app} installation looks incomplete. Select 'Update {app}' to reinstall it."),
            );
        }

        reporter.log(LogLevel::Info, format!("Launching {app}..."));

        let build = Invocation::from_argv(&self.config.commands.build, &self.install_dir);
        self.run_with_spinner(reporter, "Building the project...", &build)
            .map_err(|err| LauncherError::command("building project", err))?;

        reporter.log(LogLevel::Info, "Starting the preview server...".to_string());
        let server = self.start_preview(reporter)?;

        if let Err(err) = browser::open(self.browser.as_ref(), server.url()) {
            tracing::warn!("{err}");
            reporter.log(LogLevel::Warn, err.to_string());
        }

        reporter.log(
            LogLevel::Ok,
            format!(
                "{app} is running at {}. You can stop the server with 'Ctrl+C' in the terminal where you launched DOA-Launcher.",
                server.url()
            ),
        );
        Ok(server)
    }

    pub fn update(&self, reporter: &dyn Reporter) -> Result<PreviewServer, LauncherError> {
        let app = &self.config.general.app_name;
        self.require_installed()?;

        reporter.log(LogLevel::Info, format!("Updating {app}..."));

        reporter.step_started(&format!("Removing old {app} directory..."));
        let removed = fs::remove_dir_all(&self.install_dir);
        reporter.step_finished();
        removed.map_err(|err| {
            LauncherError::filesystem("removing old directory", &self.install_dir, err)
        })?;

        self.install(reporter)?;
        let server = self.launch(reporter)?;

        reporter.log(
            LogLevel::Ok,
            format!("{app} has been updated and launched successfully."),
        );
        Ok(server)
    }

    fn require_installed(&self) -> Result<(), LauncherError> {
        if self.is_installed() {
            Ok(())
        } else {
            Err(LauncherError::NotInstalled {
                app: self.config.general.app_name.clone(),
            })
        }
    }

    fn start_preview(&self, reporter: &dyn Reporter) -> Result<PreviewServer, LauncherError> {
        let preview = &self.config.preview;
        let invocation = Invocation::from_argv(&self.config.commands.preview, &self.install_dir);

        reporter.step_started("Starting preview server...");
        let result = self
            .shell
            .spawn(&invocation)
            .map_err(|err| LauncherError::command("starting preview server", err))
            .and_then(|process| {
                PreviewServer::await_ready(
                    process,
                    &preview.host,
                    preview.port,
                    self.config.preview_url(),
                    Duration::from_secs(preview.ready_timeout_secs),
                    &self.interrupt,
                )
            });
        reporter.step_finished();

        result
    }

    /// Run one command under a spinner. The spinner stops exactly once, whatever the outcome.
    fn run_with_spinner(
        &self,
        reporter: &dyn Reporter,
        label: &str,
        invocation: &Invocation,
    ) -> Result<(), CommandError> {
        reporter.step_started(label);
        let result = self.shell.run(invocation, &self.interrupt);
        reporter.step_finished();

        if let Err(err) = &result {
            tracing::error!(program = err.program(), "`{invocation}` failed: {err}");
        }

        result
    }
}

/// Last path segment of a repository URL, without `.git`.
fn repo_slug(repo: &str) -> String {
    let trimmed = repo.trim_end_matches('/').trim_end_matches(".git");
    trimmed
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("application")
        .to_string()
}
