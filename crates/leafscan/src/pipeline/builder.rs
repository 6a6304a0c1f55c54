use crate::{
    catalog::LabelCatalog,
    error::{LeafError, Result},
    handle::ModelHandle,
    pipeline::Pipeline,
    preprocessing::{ChannelOrder, PreprocessConfig},
    preview::PreviewConfig,
    traits::ClassificationModel,
};

/// Builder for creating a [`Pipeline`] with a fluent API
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    model: Option<ModelHandle>,
    catalog: Option<LabelCatalog>,
    preprocess: PreprocessConfig,
    preview: PreviewConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the classifier (replaces any existing one)
    pub fn model<M>(mut self, model: M) -> Self
    where
        M: ClassificationModel + 'static,
    {
        self.model = Some(ModelHandle::new(model));
        self
    }

    /// Share an already wrapped classifier
    pub fn model_handle(mut self, handle: ModelHandle) -> Self {
        self.model = Some(handle);
        self
    }

    /// Set the label catalog. Defaults to the PlantVillage list.
    pub fn catalog(mut self, catalog: LabelCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn preprocess(mut self, config: PreprocessConfig) -> Self {
        self.preprocess = config;
        self
    }

    pub fn channel_order(mut self, order: ChannelOrder) -> Self {
        self.preprocess.channel_order = order;
        self
    }

    pub fn preview(mut self, config: PreviewConfig) -> Self {
        self.preview = config;
        self
    }

    /// JPEG quality of the preview image
    pub fn preview_quality(mut self, quality: u8) -> Self {
        self.preview.quality = quality;
        self
    }

    /// Build the pipeline. A model is required.
    pub fn build(self) -> Result<Pipeline> {
        let model = self
            .model
            .ok_or_else(|| LeafError::Configuration("no classification model configured".to_string()))?;
        let catalog = self.catalog.unwrap_or_else(LabelCatalog::plant_village);

        Pipeline::new(model, catalog, self.preprocess, self.preview)
    }
}
