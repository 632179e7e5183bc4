//! End-to-end detection for one dataset record.

use std::fmt;
use std::fs;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Local};
use lncd_config::{AgentsConfig, Config};
use lncd_core::{
    DatasetRecord, LLMProvider, LicenseCatalog, LicenseProfile, LicenseTerms, RuleTally,
    SourceKind, safe_name,
};
use lncd_sources::{
    DatasetSource, GithubRepo, GithubSource, HttpClient, HuggingfaceDataset, HuggingfaceSource,
    KaggleDataset, KaggleSource, WebFetcher,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::compliance::{self, Audited, ComplianceChecker};
use crate::filter::{Candidate, DownstreamFilter, Judged};
use crate::license::LicenseFormalizer;
use crate::open_source::{OpenSourceCheck, OpenSourceReport};

type BoxedSource<T> = Box<dyn DatasetSource<Item = T>>;

/// Stage counts for one source branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: SourceKind,
    pub coarse: usize,
    pub processed: usize,
    pub downstream: usize,
    pub violating: usize,
    pub violations: RuleTally,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceReport {
    #[must_use]
    pub fn new(source: SourceKind) -> Self {
        Self {
            source,
            coarse: 0,
            processed: 0,
            downstream: 0,
            violating: 0,
            violations: RuleTally::default(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionReport {
    pub keyword: String,
    pub title: String,
    pub license: String,
    pub license_analysis: LicenseTerms,
    pub sources: Vec<SourceReport>,
    /// Per-rule counts summed over every source.
    pub violations: RuleTally,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_source: Option<OpenSourceReport>,
    pub generated_at: DateTime<Local>,
}

impl fmt::Display for DetectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.title, self.keyword)?;
        writeln!(f, "License: {}", self.license)?;
        let required = self.license_analysis.required_rules();
        if required.is_empty() {
            writeln!(f, "Obligations: none")?;
        } else {
            let names: Vec<&str> = required.iter().map(|rule| rule.as_str()).collect();
            writeln!(f, "Obligations: {}", names.join(", "))?;
        }

        for source in &self.sources {
            write!(
                f,
                "{}: coarse {}, processed {}, downstream {}, violating {}",
                source.source, source.coarse, source.processed, source.downstream, source.violating
            )?;
            match &source.error {
                Some(e) => writeln!(f, " (failed: {e})")?,
                None => writeln!(f)?,
            }
        }

        writeln!(f, "Violations: {}", self.violations.total())?;
        for (rule, count) in self.violations.iter().filter(|(_, count)| *count > 0) {
            writeln!(f, "  {rule}: {count}")?;
        }

        if let Some(open_source) = &self.open_source {
            match &open_source.error {
                Some(e) => writeln!(f, "Open-source check failed: {e}")?,
                None => writeln!(
                    f,
                    "Citing papers: {} ({} PDF, {} scanned, {} naming an open platform)",
                    open_source.cited_papers,
                    open_source.pdf_papers,
                    open_source.scanned,
                    open_source.platform_hits
                )?,
            }
        }
        Ok(())
    }
}

/// Wires the license, search, judging and audit stages over one store.
pub struct DetectionPipeline<P = Arc<dyn LLMProvider>> {
    formalizer: LicenseFormalizer<P>,
    filter: DownstreamFilter<P>,
    checker: ComplianceChecker<P>,
    store: ArtifactStore,
    github: Option<BoxedSource<GithubRepo>>,
    huggingface: Option<BoxedSource<HuggingfaceDataset>>,
    kaggle: Option<BoxedSource<KaggleDataset>>,
    open_source: Option<OpenSourceCheck>,
}

impl<P: LLMProvider + Clone> DetectionPipeline<P> {
    /// A pipeline with no sources and no open-source check.
    pub fn new(provider: P, agents: &AgentsConfig, store: ArtifactStore) -> Self {
        Self {
            formalizer: LicenseFormalizer::new(provider.clone(), &agents.license_model),
            filter: DownstreamFilter::new(provider.clone(), &agents.filter_model),
            checker: ComplianceChecker::new(provider, &agents.compliance_model),
            store,
            github: None,
            huggingface: None,
            kaggle: None,
            open_source: None,
        }
    }

    pub fn from_config(provider: P, config: &Config) -> anyhow::Result<Self> {
        let http = HttpClient::new(&config.http).context("failed to build HTTP client")?;
        let fetcher = WebFetcher::new(&config.http).context("failed to build license page fetcher")?;

        let mut catalog = LicenseCatalog::builtin();
        if let Some(path) = &config.pipeline.license_table {
            let table = fs::read_to_string(path)
                .with_context(|| format!("failed to read license table {}", path.display()))?;
            let count = catalog
                .extend_from_json(&table)
                .with_context(|| format!("invalid license table {}", path.display()))?;
            info!("Loaded {count} licenses from {}", path.display());
        }

        let mut pipeline = Self::new(
            provider,
            &config.agents,
            ArtifactStore::new(&config.pipeline.output_dir),
        );
        pipeline.formalizer = pipeline
            .formalizer
            .with_catalog(catalog)
            .with_fetcher(Arc::new(fetcher));

        for source in &config.pipeline.sources {
            pipeline = match source {
                SourceKind::Github => pipeline.with_github(GithubSource::new(
                    http.clone(),
                    config.sources.github.clone(),
                )),
                SourceKind::Huggingface => pipeline.with_huggingface(HuggingfaceSource::new(
                    http.clone(),
                    &config.sources.huggingface,
                )),
                SourceKind::Kaggle => {
                    pipeline.with_kaggle(KaggleSource::new(http.clone(), &config.sources.kaggle))
                }
            };
        }

        if config.pipeline.open_source_check {
            pipeline = pipeline.with_open_source(OpenSourceCheck::from_config(config)?);
        }
        Ok(pipeline)
    }
}

impl<P: LLMProvider> DetectionPipeline<P> {
    #[must_use]
    pub fn with_formalizer(mut self, formalizer: LicenseFormalizer<P>) -> Self {
        self.formalizer = formalizer;
        self
    }

    #[must_use]
    pub fn with_github(mut self, source: impl DatasetSource<Item = GithubRepo> + 'static) -> Self {
        self.github = Some(Box::new(source));
        self
    }

    #[must_use]
    pub fn with_huggingface(
        mut self,
        source: impl DatasetSource<Item = HuggingfaceDataset> + 'static,
    ) -> Self {
        self.huggingface = Some(Box::new(source));
        self
    }

    #[must_use]
    pub fn with_kaggle(mut self, source: impl DatasetSource<Item = KaggleDataset> + 'static) -> Self {
        self.kaggle = Some(Box::new(source));
        self
    }

    #[must_use]
    pub fn with_open_source(mut self, check: OpenSourceCheck) -> Self {
        self.open_source = Some(check);
        self
    }

    #[must_use]
    pub const fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Formalize the record's license and save the profile.
    pub async fn formalize_license(&self, record: &DatasetRecord) -> anyhow::Result<LicenseProfile> {
        let keyword = safe_name(&record.representative_term);
        let profile = self.formalizer.formalize(record).await?;
        self.store
            .save_json(ArtifactKind::LicenseProfile, &keyword, &profile)?;
        Ok(profile)
    }

    /// Search `source` for the representative term and save the raw hits.
    pub async fn coarse_search<S>(&self, source: &S, record: &DatasetRecord) -> anyhow::Result<Vec<Value>>
    where
        S: DatasetSource + ?Sized,
    {
        let keyword = safe_name(&record.representative_term);
        let kind = source.kind();
        info!("Searching {kind} for {}", record.representative_term);
        let hits = source
            .search(&record.representative_term)
            .await
            .with_context(|| format!("{kind} search failed"))?;
        self.store.save_json(ArtifactKind::Coarse(kind), &keyword, &hits)?;
        Ok(hits)
    }

    /// Enrich the saved hits of `source` and save the result.
    pub async fn process<S>(&self, source: &S, keyword: &str) -> anyhow::Result<Vec<S::Item>>
    where
        S: DatasetSource + ?Sized,
    {
        let kind = source.kind();
        let hits: Vec<Value> = self.store.load_json(ArtifactKind::Coarse(kind), keyword)?;
        let items = source
            .enrich(&hits)
            .await
            .with_context(|| format!("{kind} enrichment failed"))?;
        self.store
            .save_json(ArtifactKind::Processed(kind), keyword, &items)?;
        Ok(items)
    }

    /// Judge the saved processed items of `source` and save the verdicts.
    pub async fn fine_filter<T: Candidate>(
        &self,
        source: SourceKind,
        record: &DatasetRecord,
    ) -> anyhow::Result<Vec<Judged<T>>> {
        let keyword = safe_name(&record.representative_term);
        let items: Vec<T> = self
            .store
            .load_json(ArtifactKind::Processed(source), &keyword)?;
        let judged = self.filter.filter(items, record).await;
        self.store
            .save_json(ArtifactKind::Filtered(source), &keyword, &judged)?;
        Ok(judged)
    }

    /// Audit the saved downstream verdicts of `source` and save the result.
    pub async fn check_compliance<T: Candidate>(
        &self,
        source: SourceKind,
        profile: &LicenseProfile,
    ) -> anyhow::Result<Vec<Audited<T>>> {
        let keyword = safe_name(&profile.representative_term);
        let judged: Vec<Judged<T>> = self
            .store
            .load_json(ArtifactKind::Filtered(source), &keyword)?;
        let audited = self.checker.audit(judged, profile).await;
        self.store
            .save_json(ArtifactKind::Violations(source), &keyword, &audited)?;
        Ok(audited)
    }

    async fn drive<T: Candidate>(
        &self,
        source: &dyn DatasetSource<Item = T>,
        record: &DatasetRecord,
        profile: &LicenseProfile,
        report: &mut SourceReport,
    ) -> anyhow::Result<()> {
        let keyword = safe_name(&record.representative_term);
        report.coarse = self.coarse_search(source, record).await?.len();
        report.processed = self.process(source, &keyword).await?.len();

        let judged: Vec<Judged<T>> = self.fine_filter(report.source, record).await?;
        report.downstream = judged.iter().filter(|j| j.is_downstream()).count();

        let audited: Vec<Audited<T>> = self.check_compliance(report.source, profile).await?;
        report.violating = audited.iter().filter(|a| a.has_violation).count();
        report.violations = compliance::tally(&audited);
        Ok(())
    }

    async fn run_source<T: Candidate>(
        &self,
        source: Option<&dyn DatasetSource<Item = T>>,
        record: &DatasetRecord,
        profile: &LicenseProfile,
    ) -> Option<SourceReport> {
        let source = source?;
        let mut report = SourceReport::new(source.kind());
        if let Err(e) = self.drive(source, record, profile, &mut report).await {
            error!("{} branch failed: {e:#}", report.source);
            report.error = Some(format!("{e:#}"));
        }
        Some(report)
    }

    async fn run_open_source(&self, profile: &LicenseProfile) -> Option<OpenSourceReport> {
        if !profile.license_analysis.open_source {
            return None;
        }
        let Some(check) = &self.open_source else {
            warn!("License requires open-sourcing but the open-source check is disabled");
            return None;
        };
        let keyword = safe_name(&profile.representative_term);
        Some(match check.run(profile, &self.store, &keyword).await {
            Ok(report) => report,
            Err(e) => {
                error!("Open-source check failed: {e:#}");
                OpenSourceReport::failed(&e)
            }
        })
    }

    pub async fn run(&self, record: &DatasetRecord) -> anyhow::Result<DetectionReport> {
        let keyword = safe_name(&record.representative_term);
        if keyword.is_empty() {
            anyhow::bail!(
                "representative term {:?} yields no usable file name",
                record.representative_term
            );
        }

        let profile = self.formalize_license(record).await?;
        info!(
            "License {} requires: {:?}",
            profile.license,
            profile.license_analysis.required_rules()
        );

        let (github, huggingface, kaggle, open_source) = tokio::join!(
            self.run_source(self.github.as_deref(), record, &profile),
            self.run_source(self.huggingface.as_deref(), record, &profile),
            self.run_source(self.kaggle.as_deref(), record, &profile),
            self.run_open_source(&profile),
        );

        let sources: Vec<SourceReport> = [github, huggingface, kaggle].into_iter().flatten().collect();
        let mut violations = RuleTally::default();
        for source in &sources {
            violations += &source.violations;
        }

        let report = DetectionReport {
            keyword: keyword.clone(),
            title: profile.title,
            license: profile.license,
            license_analysis: profile.license_analysis,
            sources,
            violations,
            open_source,
            generated_at: Local::now(),
        };
        self.store.save_json(ArtifactKind::Report, &keyword, &report)?;
        Ok(report)
    }
}
