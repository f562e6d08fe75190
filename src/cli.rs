// Command line surface: clap definitions for `upload`, `applications upload`
// and `builds upload`, and the dispatch that turns them into API calls.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::api::{
    ApiClient, Application, ApplicationBuild, ApplicationType, TargetPlatform, XrPlatform,
};
use crate::auth;
use crate::config::{Settings, DEFAULT_ENDPOINT, ENDPOINT_ENV};
use crate::upload::DEFAULT_CHUNK_SIZE;

/// Client for Portal's API for application management
#[derive(Parser, Debug)]
#[command(name = "portal", version)]
pub struct Cli {
    /// URL of the Portal backend instance
    #[arg(long, global = true, env = ENDPOINT_ENV, default_value = DEFAULT_ENDPOINT)]
    pub base_url: String,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Hide progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a file in chunks to a collection URL and print the resulting URL
    Upload {
        /// File to upload
        file: PathBuf,

        /// Collection URL receiving the chunks and the finalize request
        #[arg(long)]
        url: String,

        /// Chunk size in bytes
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// Manage applications
    #[command(subcommand)]
    Applications(ApplicationCommands),

    /// Manage application builds
    #[command(subcommand)]
    Builds(BuildCommands),
}

#[derive(Subcommand, Debug)]
pub enum ApplicationCommands {
    /// Upload an application to Portal
    Upload(ApplicationUploadArgs),
}

#[derive(Subcommand, Debug)]
pub enum BuildCommands {
    /// Upload a new build
    Upload(BuildUploadArgs),
}

#[derive(Args, Debug)]
pub struct ApplicationUploadArgs {
    /// Path to the application archive (.zip or .apk)
    pub application_archive: PathBuf,

    /// How the application will be named on Portal
    #[arg(long)]
    pub name: String,

    /// Short application description
    #[arg(long)]
    pub description: Option<String>,

    /// Semantic application version
    #[arg(long)]
    pub version: String,

    /// Application type
    #[arg(long = "type", value_enum, default_value_t = ApplicationType::Other)]
    pub application_type: ApplicationType,

    /// Tags to assign to the application
    #[arg(long, num_args = 1..)]
    pub tags: Vec<String>,

    /// Identity name
    #[arg(long)]
    pub application_identity: Option<String>,

    /// Target platform
    #[arg(long, value_enum, default_value_t = TargetPlatform::Windows)]
    pub target_platform: TargetPlatform,

    /// Whether this version is the current version
    #[arg(long)]
    pub current_version: Option<String>,

    /// Path to the application's executable
    #[arg(long)]
    pub executable_path: Option<String>,

    /// Package name
    #[arg(long)]
    pub package_name: Option<String>,

    /// 360° preview image
    #[arg(long)]
    pub panoramic_preview_image: Option<PathBuf>,

    /// ID(s) of any organization the app should be available in
    #[arg(long, num_args = 1.., required = true)]
    pub organization_ids: Vec<String>,

    /// Chunk size in bytes for the upload
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

#[derive(Args, Debug)]
pub struct BuildUploadArgs {
    /// Path to the application archive / package to be uploaded
    pub application_archive: PathBuf,

    /// ID of the application to upload the build to
    #[arg(long = "app-id", visible_alias = "application-id")]
    pub application: String,

    /// Semantic application build version
    #[arg(long)]
    pub version: String,

    /// Target platform
    #[arg(long, value_enum, default_value_t = TargetPlatform::Windows)]
    pub target_platform: TargetPlatform,

    /// Path to the application's executable
    #[arg(long)]
    pub executable_path: Option<String>,

    /// Package name
    #[arg(long)]
    pub package_name: Option<String>,

    /// XR platforms supported by the application
    #[arg(long = "xr-platform", visible_alias = "supported-xr-platform", value_enum, num_args = 1..)]
    pub supported_xr_platforms: Vec<XrPlatform>,

    /// Disable to not send Portal's default args to the app
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub supports_arbitrary_cli_args: bool,

    /// Launch arguments passed to the application
    #[arg(long, visible_alias = "launch-arguments", default_value = "")]
    pub launch_args: String,

    /// Changelog for the build, supports markdown
    #[arg(long, default_value = "")]
    pub changelog: String,

    /// Chunk size in bytes for the upload
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

impl From<&ApplicationUploadArgs> for Application {
    fn from(args: &ApplicationUploadArgs) -> Self {
        Application {
            name: args.name.clone(),
            description: args.description.clone(),
            version: args.version.clone(),
            identity: args.application_identity.clone(),
            current_version: args.current_version.clone(),
            application_type: args.application_type,
            tags: args.tags.clone(),
            target_platform: args.target_platform,
            package_name: args.package_name.clone(),
            executable_path: args.executable_path.clone(),
            panoramic_preview_image: args.panoramic_preview_image.clone(),
            organization_ids: args.organization_ids.clone(),
        }
    }
}

impl From<BuildUploadArgs> for ApplicationBuild {
    fn from(args: BuildUploadArgs) -> Self {
        ApplicationBuild {
            application: args.application,
            version: args.version,
            target_platform: args.target_platform,
            executable_path: args.executable_path,
            package_name: args.package_name,
            supported_xr_platforms: args.supported_xr_platforms,
            supports_arbitrary_cli_args: args.supports_arbitrary_cli_args,
            launch_args: args.launch_args,
            changelog: args.changelog,
            application_archive: None,
        }
    }
}

fn client(base_url: &str, quiet: bool, chunk_size: usize) -> Result<ApiClient> {
    let mut settings = Settings::new(base_url)?;
    settings.chunk_size = chunk_size;
    settings.quiet = quiet;
    let authorization = auth::authorization_header()?;
    ApiClient::new(settings, authorization)
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let out = serde_json::to_string(value).context("Failed to encode response")?;
    println!("{out}");
    Ok(())
}

/// Run the parsed command. Output goes to stdout; errors are returned.
pub fn run(cli: Cli) -> Result<()> {
    let Cli {
        base_url,
        quiet,
        command,
        ..
    } = cli;

    match command {
        Commands::Upload {
            file,
            url,
            chunk_size,
        } => {
            let api = client(&base_url, quiet, chunk_size)?;
            let uploaded = api.upload_file(&url, &file)?;
            println!("{uploaded}");
            Ok(())
        }
        Commands::Applications(ApplicationCommands::Upload(args)) => {
            let api = client(&base_url, quiet, args.chunk_size)?;
            let application = Application::from(&args);
            let response = api.upload_application(&args.application_archive, &application)?;
            print_json(&response)
        }
        Commands::Builds(BuildCommands::Upload(args)) => {
            let api = client(&base_url, quiet, args.chunk_size)?;
            let archive = args.application_archive.clone();
            let response = api.upload_application_build(&archive, args.into())?;
            print_json(&response)
        }
    }
}
