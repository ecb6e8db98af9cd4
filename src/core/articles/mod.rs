// Articles module - reads topics from a sheet, drafts articles, publishes documents.

pub mod article_models;
pub mod article_pipeline;
pub mod article_ports;

pub use article_models::{Article, PublishedDocument, SheetRow};
pub use article_pipeline::{ArticlePipeline, PipelineError, RunReport};
pub use article_ports::{
    ArticleWriter, DocumentSink, GenerationError, PublishError, SheetError, SheetSource,
};
