use clap::Parser;
use std::path::PathBuf;
use studio_invoice::{
    assembler::PdfAssembler,
    configuration::Configuration,
    error::{ContextError, ErrorKind},
    generator::InvoicePdfGenerator,
    invoice::{InvoiceDraft, InvoiceForm},
    templates::DirectoryTemplateSource,
};

#[derive(Parser, Debug)]
#[command(version, about = "Compose the PDF document of an invoice", long_about = None)]
struct CliArguments {
    /// The JSON file of the invoice form.
    #[arg(short = 'i', long = "invoice", value_name = "json_file")]
    invoice_path: PathBuf,
    #[arg(short = 'c', long = "configuration", value_name = "json_file")]
    configuration_path: Option<PathBuf>,
    /// Overrides the templates directory of the configuration.
    #[arg(short = 't', long = "templates", value_name = "directory")]
    templates_directory: Option<PathBuf>,
    /// Where to write the document, by default its suggested file name in the current directory.
    #[arg(short = 'o', long = "output", value_name = "file_path")]
    output_file_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(error) = fallible_main().await {
        log::error!("{} ({})", error, error.kind);
        std::process::exit(1);
    }
}

async fn fallible_main() -> Result<(), ContextError> {
    let arguments = CliArguments::parse();
    log::debug!("{:?}", arguments);

    let mut configuration = match &arguments.configuration_path {
        Some(configuration_path) => Configuration::from_path(configuration_path)?,
        None => Configuration::default(),
    };
    if let Some(templates_directory) = arguments.templates_directory {
        configuration.templates_directory = templates_directory;
    }
    log::debug!("{:?}", configuration);

    let draft = InvoiceDraft::try_from(InvoiceForm::from_path(&arguments.invoice_path)?)?;
    let source = DirectoryTemplateSource::new(&configuration.templates_directory);
    let generator = InvoicePdfGenerator::new(PdfAssembler::new(source, configuration));

    let output_file_path = arguments.output_file_path;
    let mut saved_path = None;
    generator
        .generate(&draft, |handle| {
            let saved = match &output_file_path {
                Some(file_path) => handle.save_to(file_path).map(|_| file_path.clone()),
                None => handle.save_in_directory(&PathBuf::from(".")),
            };
            saved_path = Some(saved);
        })
        .await?;

    let saved_path = saved_path
        .ok_or_else(|| ContextError::with_context(ErrorKind::Composition, "No document was generated"))??;
    log::info!("Saved the output file to the path: {:?}", saved_path);

    Ok(())
}
