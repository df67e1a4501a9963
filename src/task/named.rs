//! Named composites wired from the site configuration.

use std::sync::Arc;

use anyhow::{Context, Result};

use super::{Step, Task, TransformStep};
use crate::asset::{AssetClass, Globs};
use crate::clean::Cleaner;
use crate::config::SiteConfig;
use crate::core::BuildMode;
use crate::deploy::{UploadStep, Uploader};
use crate::measure::SizeReporter;
use crate::reload::{ReloadChannel, ReloadKind};
use crate::transform::{
    CopyTransform, ImageTransform, PageTransform, ScriptTransform, StyleTransform, Transform,
    UserefTransform,
};

/// Every step of the pipeline, constructed once per process.
///
/// With a reload channel (serve mode), `style` publishes `StyleInject`
/// and `script`/`page` publish `FullReload` after writing.
pub struct Steps {
    pub clean: Arc<dyn Step>,
    pub style: Arc<dyn Step>,
    pub script: Arc<dyn Step>,
    pub page: Arc<dyn Step>,
    pub image: Arc<dyn Step>,
    pub font: Arc<dyn Step>,
    pub extra: Arc<dyn Step>,
    pub useref: Arc<dyn Step>,
    pub measure: Arc<dyn Step>,
}

impl Steps {
    pub fn new(config: &SiteConfig, mode: BuildMode, reload: Option<&ReloadChannel>) -> Result<Self> {
        let build = &config.build;
        let page = PageTransform::new(build.partials.clone(), &config.data)?;

        let class_step = |class: AssetClass, transform: Arc<dyn Transform>| -> Result<TransformStep> {
            let (base, out) = match class {
                AssetClass::Style | AssetClass::Script | AssetClass::Page => (&build.src, &build.temp),
                AssetClass::Image | AssetClass::Font => (&build.src, &build.dist),
                AssetClass::Extra => (&build.public, &build.dist),
            };
            let globs = Globs::new(&class.patterns(config))
                .with_context(|| format!("invalid globs for `{}`", class.step_name()))?;
            let step = TransformStep::new(class.step_name(), base, globs, out, transform);

            let kind = match class {
                AssetClass::Style => Some(ReloadKind::StyleInject),
                AssetClass::Script | AssetClass::Page => Some(ReloadKind::FullReload),
                _ => None,
            };
            Ok(match (reload, kind) {
                (Some(channel), Some(kind)) => step.with_reload(channel.clone(), kind),
                _ => step,
            })
        };

        let useref = TransformStep::new(
            "useref",
            &build.temp,
            Globs::new(&["*.html"])?,
            &build.dist,
            Arc::new(UserefTransform::new(
                vec![build.temp.clone(), config.root.clone()],
                mode,
            )),
        );

        Ok(Self {
            clean: Arc::new(Cleaner::new(vec![build.dist.clone(), build.temp.clone()])),
            style: Arc::new(class_step(AssetClass::Style, Arc::new(StyleTransform::default()))?),
            script: Arc::new(class_step(AssetClass::Script, Arc::new(ScriptTransform))?),
            page: Arc::new(class_step(AssetClass::Page, Arc::new(page))?),
            image: Arc::new(class_step(AssetClass::Image, Arc::new(ImageTransform))?),
            font: Arc::new(class_step(AssetClass::Font, Arc::new(CopyTransform))?),
            extra: Arc::new(class_step(AssetClass::Extra, Arc::new(CopyTransform))?),
            useref: Arc::new(useref),
            measure: Arc::new(SizeReporter::new(build.dist.clone(), mode)),
        })
    }

    pub fn clean(&self) -> Task {
        Task::Leaf(Arc::clone(&self.clean))
    }

    /// `Parallel(style, script, page)`
    pub fn compile(&self) -> Task {
        Task::Parallel(vec![
            Task::Leaf(Arc::clone(&self.style)),
            Task::Leaf(Arc::clone(&self.script)),
            Task::Leaf(Arc::clone(&self.page)),
        ])
    }

    /// `Sequential(clean, Parallel(Sequential(compile, useref), image, font, extra), measure)`
    pub fn build(&self) -> Task {
        Task::Sequential(vec![
            self.clean(),
            Task::Parallel(vec![
                Task::Sequential(vec![self.compile(), Task::Leaf(Arc::clone(&self.useref))]),
                Task::Leaf(Arc::clone(&self.image)),
                Task::Leaf(Arc::clone(&self.font)),
                Task::Leaf(Arc::clone(&self.extra)),
            ]),
            Task::Leaf(Arc::clone(&self.measure)),
        ])
    }

    /// `Sequential(build, upload)`
    pub fn deploy(&self, uploader: Arc<dyn Uploader>, dist: &std::path::Path) -> Task {
        Task::Sequential(vec![
            self.build(),
            Task::leaf(UploadStep::new(uploader, dist.to_path_buf())),
        ])
    }
}
