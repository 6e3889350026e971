//! Page translation workflow.
//!
//! ```text
//! langlinks ─┬─> target already linked ──────────────> skipped
//!            └─> target title (existing link or translated)
//!                 ├─> target page exists ─────────────> linked
//!                 └─> fetch ─> JSON subpages ─> protect ─> mask ─> chunk
//!                      ─> translate (concurrent) ─> join ─> unmask
//!                      ─> restore protected values ─> substitute subpages
//!                      ─> structure check + translator review
//!                      ─> publish + interwiki links ─> translated
//! ```

use crate::audit::{AuditLog, AuditRow, PageStatus};
use crate::store::{ContentModel, PageStore};
use crate::translator::{TranslationTask, Translator, ValidationReport};
use anyhow::Result;
use futures::future::try_join_all;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use wikitrans_chunker::Chunker;
use wikitrans_wikitext::{
    extract_subresource_refs, interwiki_marker, json_subpage_name, json_subpage_target,
    mask_templates, restore_protected_values, split_namespace, unmask, upsert_interwiki_link,
    ProtectedParams, StructureReport, SubresourcePlaceholders,
};

const PAGE_SUMMARY: &str = "Automated translation";
const JSON_SUMMARY: &str = "Automated JSON translation";
const LINK_SUMMARY: &str = "Add interwiki link";

/// Looks up the store of another language edition, `None` when unavailable
pub type StoreResolver = Box<dyn Fn(&str) -> Result<Option<Arc<dyn PageStore>>> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub source_lang: String,
    pub target_lang: String,
    /// Do everything except writing pages
    pub dry_run: bool,
    /// Retranslate even when a translation is already linked or present
    pub force: bool,
}

/// What happened to one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Skipped { target_title: String },
    Linked { target_title: String },
    /// The source page has no text
    Missing,
    Translated(TranslatedPage),
}

impl PageOutcome {
    #[must_use]
    pub const fn status(&self) -> PageStatus {
        match self {
            Self::Skipped { .. } => PageStatus::Skipped,
            Self::Linked { .. } => PageStatus::Linked,
            Self::Missing => PageStatus::Error,
            Self::Translated(_) => PageStatus::Translated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedPage {
    pub target_title: String,
    /// Translated wikitext, before interwiki markers are appended
    pub text: String,
    pub chunks: usize,
    /// JSON subpages moved to the target edition
    pub subpages: BTreeMap<String, String>,
    pub report: StructureReport,
    /// Translator's own review of the result
    pub validation: ValidationReport,
}

impl TranslatedPage {
    /// Audit notes: structure mismatches, then validator issues, `;`-separated
    #[must_use]
    pub fn notes(&self) -> String {
        let structure = (!self.report.is_clean()).then(|| self.report.to_string());
        structure
            .into_iter()
            .chain(self.validation.issues.iter().cloned())
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Per-status page counts of a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub translated: usize,
    pub linked: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl PipelineSummary {
    fn record(&mut self, status: PageStatus) {
        match status {
            PageStatus::Translated => self.translated += 1,
            PageStatus::Linked => self.linked += 1,
            PageStatus::Skipped => self.skipped += 1,
            PageStatus::Error => self.errors += 1,
        }
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.translated + self.linked + self.skipped + self.errors
    }
}

impl std::ops::AddAssign for PipelineSummary {
    fn add_assign(&mut self, other: Self) {
        self.translated += other.translated;
        self.linked += other.linked;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pages: {} | Translated: {} | Linked: {} | Skipped: {} | Errors: {}",
            self.total(),
            self.translated,
            self.linked,
            self.skipped,
            self.errors
        )
    }
}

pub struct TranslationPipeline {
    source: Arc<dyn PageStore>,
    target: Arc<dyn PageStore>,
    translator: Arc<dyn Translator>,
    chunker: Chunker,
    protected: ProtectedParams,
    options: PipelineOptions,
    audit: Option<AuditLog>,
    resolver: Option<StoreResolver>,
    other_stores: HashMap<String, Option<Arc<dyn PageStore>>>,
}

impl TranslationPipeline {
    pub fn new(
        source: Arc<dyn PageStore>,
        target: Arc<dyn PageStore>,
        translator: Arc<dyn Translator>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            source,
            target,
            translator,
            chunker: Chunker::default(),
            protected: ProtectedParams::default(),
            options,
            audit: None,
            resolver: None,
            other_stores: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    #[must_use]
    pub fn with_protected(mut self, protected: ProtectedParams) -> Self {
        self.protected = protected;
        self
    }

    #[must_use]
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Enables propagating the new link to other language editions
    #[must_use]
    pub fn with_store_resolver(mut self, resolver: StoreResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Process titles in order; a failing page is logged and recorded, not fatal.
    /// Blank lines and `#` comments are ignored.
    pub async fn process_pages<S: AsRef<str>>(&mut self, titles: &[S]) -> PipelineSummary {
        let mut summary = PipelineSummary::default();
        for title in titles {
            let title = title.as_ref().trim();
            if title.is_empty() || title.starts_with('#') {
                continue;
            }
            match self.process_page(title).await {
                Ok(outcome) => summary.record(outcome.status()),
                Err(e) => {
                    log::error!("Failed to process '{title}': {e:#}");
                    self.record(title, "", PageStatus::Error, &format!("{e:#}"));
                    summary.record(PageStatus::Error);
                }
            }
        }
        summary
    }

    pub async fn process_page(&mut self, title: &str) -> Result<PageOutcome> {
        let target_lang = self.options.target_lang.clone();

        let langlinks = self.source.langlinks(title).await?;
        let linked = langlinks.get(&target_lang).cloned();
        if let Some(existing) = &linked {
            if !self.options.force {
                log::info!("Skip {title} (already translated -> {existing})");
                self.record(
                    title,
                    existing,
                    PageStatus::Skipped,
                    "already translated and present in the interwiki links",
                );
                return Ok(PageOutcome::Skipped {
                    target_title: existing.clone(),
                });
            }
            log::info!("Force mode: retranslating {title} (existing: {existing})");
        }

        // An existing link fixes the target title, even when forcing
        let target_title = match linked {
            Some(existing) => existing,
            None => self.translate_title(title).await,
        };

        if !self.options.force && self.target.page_exists(&target_title).await? {
            log::info!("Target page {target_title} already exists; only linking it from {title}");
            if !self.options.dry_run {
                add_interwiki_link(self.source.as_ref(), title, &target_lang, &target_title).await?;
            }
            self.record(
                title,
                &target_title,
                PageStatus::Linked,
                "target exists - adding interwiki on the source page only",
            );
            return Ok(PageOutcome::Linked { target_title });
        }

        let Some(wikitext) = self.source.fetch_wikitext(title).await? else {
            log::warn!("No wikitext for {title}");
            self.record(title, "", PageStatus::Error, "missing wikitext");
            return Ok(PageOutcome::Missing);
        };

        log::info!("Translating page: {title}");
        let page = self.translate_wikitext(&wikitext, &target_title).await?;
        if !page.report.is_clean() {
            log::warn!("Structure mismatch for {title}: {}", page.report);
        }

        if !self.options.dry_run {
            self.publish(title, &page, &langlinks).await?;
        }

        if page.validation.has_issues() {
            log::warn!("Validator issues for {title}: {}", page.validation.issues.join("; "));
        }
        self.record(title, &page.target_title, PageStatus::Translated, &page.notes());
        log::info!(
            "Translated {title} -> {} ({})",
            page.target_title,
            if self.options.dry_run { "dry-run" } else { "published" }
        );
        Ok(PageOutcome::Translated(page))
    }

    /// Run the structure-preserving translation of one document
    pub async fn translate_wikitext(&self, wikitext: &str, target_title: &str) -> Result<TranslatedPage> {
        let refs = extract_subresource_refs(wikitext);
        let placeholders = SubresourcePlaceholders::for_document(wikitext, &refs);
        let mut subpages = BTreeMap::new();
        if !placeholders.is_empty() {
            log::info!("Found {} JSON template reference(s)", refs.len());
        }
        for raw in placeholders.references() {
            if let Some(target) = self.move_json_subpage(raw, target_title).await? {
                subpages.insert(raw.to_string(), target);
            }
        }

        let protected = placeholders.protect(wikitext);
        let masked = mask_templates(&protected);
        if !masked.protected {
            log::warn!("Template names and keys are not masked for {target_title}");
        }

        let chunks = self.chunker.chunk_text(&masked.text);
        log::debug!("{}", Chunker::get_stats(&chunks));
        for chunk in chunks.iter().filter(|c| c.is_oversized()) {
            log::warn!(
                "Chunk of ~{} tokens exceeds the budget of {}",
                chunk.estimated_tokens,
                self.chunker.config().max_tokens
            );
        }

        let (source_lang, target_lang) = (&self.options.source_lang, &self.options.target_lang);
        let translated = try_join_all(chunks.iter().map(|chunk| {
            self.translator
                .translate(TranslationTask::Wikitext, &chunk.content, source_lang, target_lang)
        }))
        .await?;

        let joined = self.chunker.reassemble(&translated);
        let unmasked = unmask(&joined, &masked.mapping);
        let restored = restore_protected_values(wikitext, &unmasked, &self.protected);
        let targets: HashMap<String, String> = subpages.clone().into_iter().collect();
        let text = placeholders.substitute(&restored, &targets);
        let report = StructureReport::compare(wikitext, &text);
        let validation = match self.translator.validate(wikitext, &text).await {
            Ok(raw) => ValidationReport::parse(&raw),
            Err(e) => {
                log::warn!("Validation of {target_title} failed: {e:#}");
                ValidationReport {
                    issues: vec![format!("validator unavailable: {e}")],
                    ..ValidationReport::default()
                }
            }
        };

        Ok(TranslatedPage {
            target_title: target_title.to_string(),
            text,
            chunks: chunks.len(),
            subpages,
            report,
            validation,
        })
    }

    /// Translate a title; the namespace goes through the prefix table and
    /// the page name through the translator, falling back to the original.
    async fn translate_title(&self, title: &str) -> String {
        let (source_lang, target_lang) = (&self.options.source_lang, &self.options.target_lang);
        let (prefix, name) = match split_namespace(title, source_lang, target_lang) {
            Some((prefix, rest)) => (Some(prefix.to_string()), rest),
            None => match title.split_once(':') {
                Some((ns, rest)) => (Some(ns.to_string()), rest),
                None => (None, title),
            },
        };

        let translated = match self
            .translator
            .translate(TranslationTask::Title, name, source_lang, target_lang)
            .await
        {
            Ok(out) if !out.trim().is_empty() => out.trim().to_string(),
            Ok(_) => name.to_string(),
            Err(e) => {
                log::warn!("Failed to translate title \"{name}\": {e:#}. Using original.");
                name.to_string()
            }
        };

        match prefix {
            Some(prefix) => format!("{prefix}:{translated}"),
            None => translated,
        }
    }

    /// Translate and publish a `Base/Name.json` subpage under the target title.
    ///
    /// Returns the new path, or `None` for references that are not JSON subpages.
    async fn move_json_subpage(&self, raw: &str, target_title: &str) -> Result<Option<String>> {
        let Some(name) = json_subpage_name(raw) else {
            return Ok(None);
        };
        let (source_lang, target_lang) = (&self.options.source_lang, &self.options.target_lang);

        let translated_name = match self
            .translator
            .translate(TranslationTask::SubpageName, name, source_lang, target_lang)
            .await
        {
            Ok(out) if !out.trim().is_empty() => out.trim().to_string(),
            Ok(_) => name.to_string(),
            Err(e) => {
                log::warn!("Failed to translate subpage name \"{name}\": {e:#}");
                name.to_string()
            }
        };
        let Some(target_path) = json_subpage_target(raw, target_title, &translated_name) else {
            return Ok(None);
        };

        let original = self.source.fetch_wikitext(raw).await?.unwrap_or_default();
        let translated = self.translate_json(raw, &original).await;
        if !self.options.dry_run {
            self.target
                .save_page(&target_path, &translated, JSON_SUMMARY, ContentModel::Json)
                .await?;
        }
        log::info!("JSON translation: {raw} -> {target_path}");
        Ok(Some(target_path))
    }

    /// Translated JSON, or the original text when either side is not valid JSON
    async fn translate_json(&self, raw: &str, original: &str) -> String {
        if let Err(e) = serde_json::from_str::<serde_json::Value>(original) {
            log::warn!("{raw} is not JSON ({e}); keeping original");
            return original.to_string();
        }
        let (source_lang, target_lang) = (&self.options.source_lang, &self.options.target_lang);
        let translated = match self
            .translator
            .translate(TranslationTask::JsonValues, original, source_lang, target_lang)
            .await
        {
            Ok(out) => out,
            Err(e) => {
                log::warn!("JSON translation failed for {raw}: {e:#}; keeping original");
                return original.to_string();
            }
        };
        match serde_json::from_str::<serde_json::Value>(&translated)
            .and_then(|value| serde_json::to_string_pretty(&value))
        {
            Ok(pretty) => pretty,
            Err(e) => {
                log::warn!("Translated JSON for {raw} is invalid ({e}); keeping original");
                original.to_string()
            }
        }
    }

    /// Save the target page with interwiki markers and link it from the
    /// source and every other known edition
    async fn publish(
        &mut self,
        title: &str,
        page: &TranslatedPage,
        langlinks: &BTreeMap<String, String>,
    ) -> Result<()> {
        let source_lang = self.options.source_lang.clone();
        let target_lang = self.options.target_lang.clone();
        let others: Vec<(&String, &String)> = langlinks
            .iter()
            .filter(|(lang, _)| **lang != source_lang && **lang != target_lang)
            .collect();

        let markers: Vec<String> = std::iter::once(interwiki_marker(&source_lang, title))
            .chain(others.iter().map(|(lang, other)| interwiki_marker(lang, other)))
            .collect();
        let text = format!("{}\n{}\n", page.text, markers.join("\n"));
        self.target
            .save_page(&page.target_title, &text, PAGE_SUMMARY, ContentModel::Wikitext)
            .await?;

        add_interwiki_link(self.source.as_ref(), title, &target_lang, &page.target_title).await?;

        for (lang, other_title) in others {
            let store = match self.store_for(lang) {
                Ok(Some(store)) => store,
                Ok(None) => {
                    log::debug!("No store for '{lang}'; {other_title} not linked");
                    continue;
                }
                Err(e) => {
                    log::warn!("No store for '{lang}': {e:#}");
                    continue;
                }
            };
            if let Err(e) = add_interwiki_link(store.as_ref(), other_title, &target_lang, &page.target_title).await {
                log::warn!(
                    "Failed updating interwiki on {lang}:{other_title} -> {}: {e:#}",
                    page.target_title
                );
            }
        }
        Ok(())
    }

    fn store_for(&mut self, lang: &str) -> Result<Option<Arc<dyn PageStore>>> {
        if let Some(store) = self.other_stores.get(lang) {
            return Ok(store.clone());
        }
        let store = match &self.resolver {
            Some(resolve) => resolve(lang)?,
            None => None,
        };
        self.other_stores.insert(lang.to_string(), store.clone());
        Ok(store)
    }

    fn record(&self, source: &str, target: &str, status: PageStatus, notes: &str) {
        let Some(audit) = &self.audit else {
            return;
        };
        let row = AuditRow {
            source_page: source.to_string(),
            target_page: target.to_string(),
            source_lang: self.options.source_lang.clone(),
            target_lang: self.options.target_lang.clone(),
            status,
            notes: notes.to_string(),
        };
        if let Err(e) = audit.append(&row) {
            log::error!("Failed to write audit log {}: {e:#}", audit.path().display());
        }
    }
}

/// Make `title` on `store` carry `[[lang:target]]`; returns whether it was edited
async fn add_interwiki_link(
    store: &dyn PageStore,
    title: &str,
    lang: &str,
    target: &str,
) -> Result<bool> {
    let text = store.fetch_wikitext(title).await?.unwrap_or_default();
    match upsert_interwiki_link(&text, lang, target) {
        Some(updated) => {
            store
                .save_page(title, &updated, LINK_SUMMARY, ContentModel::Wikitext)
                .await?;
            Ok(true)
        }
        None => {
            log::debug!("[[{lang}:{target}]] already on {title}");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::StubTranslator;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use wikitrans_wikitext::interwiki_links;

    #[derive(Default)]
    struct MemoryStore {
        pages: Mutex<BTreeMap<String, (String, ContentModel)>>,
    }

    impl MemoryStore {
        fn with_pages(pages: &[(&str, &str)]) -> Arc<Self> {
            let store = Self::default();
            for (title, text) in pages {
                store.put(title, text);
            }
            Arc::new(store)
        }

        fn put(&self, title: &str, text: &str) {
            self.pages
                .lock()
                .unwrap()
                .insert(title.to_string(), (text.to_string(), ContentModel::Wikitext));
        }

        fn text(&self, title: &str) -> Option<String> {
            self.pages.lock().unwrap().get(title).map(|(t, _)| t.clone())
        }

        fn model(&self, title: &str) -> Option<ContentModel> {
            self.pages.lock().unwrap().get(title).map(|(_, m)| *m)
        }

        fn len(&self) -> usize {
            self.pages.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PageStore for MemoryStore {
        async fn fetch_wikitext(&self, title: &str) -> Result<Option<String>> {
            Ok(self.text(title))
        }

        async fn page_exists(&self, title: &str) -> Result<bool> {
            Ok(self.text(title).is_some())
        }

        async fn langlinks(&self, title: &str) -> Result<BTreeMap<String, String>> {
            Ok(self.text(title).map(|t| interwiki_links(&t)).unwrap_or_default())
        }

        async fn save_page(&self, title: &str, text: &str, _summary: &str, model: ContentModel) -> Result<()> {
            self.pages
                .lock()
                .unwrap()
                .insert(title.to_string(), (text.to_string(), model));
            Ok(())
        }

        fn location(&self) -> String {
            "memory".to_string()
        }
    }

    /// Word-for-word French to English
    struct Glossary;

    #[async_trait]
    impl Translator for Glossary {
        async fn translate(&self, _task: TranslationTask, text: &str, _s: &str, _t: &str) -> Result<String> {
            Ok([
                ("Histoire", "History"),
                ("Rendement", "Yield"),
                ("Blé", "Wheat"),
                ("blé", "wheat"),
                ("cultivé", "grown"),
            ]
            .iter()
            .fold(text.to_string(), |acc, (fr, en)| acc.replace(fr, en)))
        }

        fn name(&self) -> &str {
            "glossary"
        }
    }

    struct Failing;

    #[async_trait]
    impl Translator for Failing {
        async fn translate(&self, _task: TranslationTask, _text: &str, _s: &str, _t: &str) -> Result<String> {
            anyhow::bail!("service unavailable")
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    /// Identity translation with a canned review
    struct Reviewer(&'static str);

    #[async_trait]
    impl Translator for Reviewer {
        async fn translate(&self, _task: TranslationTask, text: &str, _s: &str, _t: &str) -> Result<String> {
            Ok(text.to_string())
        }

        async fn validate(&self, _original: &str, _translated: &str) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "reviewer"
        }
    }

    /// Upper-cases one word
    struct Shout(&'static str);

    #[async_trait]
    impl Translator for Shout {
        async fn translate(&self, _task: TranslationTask, text: &str, _s: &str, _t: &str) -> Result<String> {
            Ok(text.replace(self.0, &self.0.to_uppercase()))
        }

        fn name(&self) -> &str {
            "shout"
        }
    }

    const SOURCE: &str = "{{Infobox|image=Blé.jpg|légende=Le blé}}\n\
        == Histoire ==\n\
        Le blé est cultivé.\n\
        {{Graphique|json=Blé/Rendement.json}}\n\
        [[es:Trigo]]\n";

    fn options(dry_run: bool, force: bool) -> PipelineOptions {
        PipelineOptions {
            source_lang: "fr".into(),
            target_lang: "en".into(),
            dry_run,
            force,
        }
    }

    fn pipeline(
        source: &Arc<MemoryStore>,
        target: &Arc<MemoryStore>,
        translator: impl Translator + 'static,
        opts: PipelineOptions,
    ) -> TranslationPipeline {
        TranslationPipeline::new(source.clone(), target.clone(), Arc::new(translator), opts)
    }

    #[tokio::test]
    async fn translates_publishes_and_links() {
        let source = MemoryStore::with_pages(&[
            ("Blé", SOURCE),
            ("Blé/Rendement.json", r#"{"titre": "Rendement du blé", "valeur": 7}"#),
        ]);
        let target = MemoryStore::with_pages(&[]);
        let spanish = MemoryStore::with_pages(&[("Trigo", "Texto\n[[fr:Blé]]\n")]);

        let es = spanish.clone();
        let resolver: StoreResolver = Box::new(move |lang: &str| -> Result<Option<Arc<dyn PageStore>>> {
            Ok((lang == "es").then(|| es.clone() as Arc<dyn PageStore>))
        });
        let mut pipeline = pipeline(&source, &target, Glossary, options(false, false)).with_store_resolver(resolver);

        let outcome = pipeline.process_page("Blé").await.unwrap();
        let PageOutcome::Translated(page) = outcome else {
            panic!("expected a translation, got {outcome:?}");
        };
        assert_eq!(page.target_title, "Wheat");
        assert!(page.report.is_clean(), "{}", page.report);
        assert_eq!(page.subpages["Blé/Rendement.json"], "Wheat/Yield.json");

        let published = target.text("Wheat").unwrap();
        assert!(published.contains("{{Infobox|image=Blé.jpg|légende=Le wheat}}"));
        assert!(published.contains("== History ==\nLe wheat est grown."));
        assert!(published.contains("{{Graphique|json=Wheat/Yield.json}}"));
        assert!(published.ends_with("[[fr:Blé]]\n[[es:Trigo]]\n"));

        let json = target.text("Wheat/Yield.json").unwrap();
        assert_eq!(target.model("Wheat/Yield.json"), Some(ContentModel::Json));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["titre"], "Yield du wheat");
        assert_eq!(value["valeur"], 7);

        assert!(source.text("Blé").unwrap().ends_with("[[en:Wheat]]\n"));
        assert_eq!(spanish.text("Trigo").unwrap(), "Texto\n[[fr:Blé]]\n[[en:Wheat]]\n");
    }

    #[tokio::test]
    async fn existing_link_skips_the_page() {
        let source = MemoryStore::with_pages(&[("Blé", "Texte\n[[en:Wheat]]\n")]);
        let target = MemoryStore::with_pages(&[]);
        let mut pipeline = pipeline(&source, &target, Glossary, options(false, false));

        let outcome = pipeline.process_page("Blé").await.unwrap();
        assert_eq!(outcome, PageOutcome::Skipped { target_title: "Wheat".into() });
        assert_eq!(target.len(), 0);
    }

    #[tokio::test]
    async fn existing_target_is_only_linked() {
        let source = MemoryStore::with_pages(&[("Catégorie:Blé", "Texte")]);
        let target = MemoryStore::with_pages(&[("Category:Wheat", "Existing")]);
        let mut pipeline = pipeline(&source, &target, Glossary, options(false, false));

        let outcome = pipeline.process_page("Catégorie:Blé").await.unwrap();
        assert_eq!(outcome, PageOutcome::Linked { target_title: "Category:Wheat".into() });
        assert_eq!(source.text("Catégorie:Blé").unwrap(), "Texte\n[[en:Category:Wheat]]\n");
        assert_eq!(target.text("Category:Wheat").unwrap(), "Existing");
    }

    #[tokio::test]
    async fn force_reuses_linked_title_and_overwrites() {
        let source = MemoryStore::with_pages(&[("Blé", "Le blé.\n[[en:Common wheat]]\n")]);
        let target = MemoryStore::with_pages(&[("Common wheat", "Old")]);
        let mut pipeline = pipeline(&source, &target, Glossary, options(false, true));

        let outcome = pipeline.process_page("Blé").await.unwrap();
        assert_eq!(outcome.status(), PageStatus::Translated);
        assert!(target.text("Common wheat").unwrap().starts_with("Le wheat."));
        assert_eq!(source.text("Blé").unwrap(), "Le blé.\n[[en:Common wheat]]\n");
    }

    #[tokio::test]
    async fn missing_source_is_reported() {
        let source = MemoryStore::with_pages(&[]);
        let target = MemoryStore::with_pages(&[]);
        let mut pipeline = pipeline(&source, &target, StubTranslator, options(false, false));
        assert_eq!(pipeline.process_page("Absent").await.unwrap(), PageOutcome::Missing);
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let source = MemoryStore::with_pages(&[
            ("Blé", SOURCE),
            ("Blé/Rendement.json", "{}"),
        ]);
        let target = MemoryStore::with_pages(&[]);
        let mut pipeline = pipeline(&source, &target, Glossary, options(true, false));

        let outcome = pipeline.process_page("Blé").await.unwrap();
        assert_eq!(outcome.status(), PageStatus::Translated);
        assert_eq!(target.len(), 0);
        assert_eq!(source.text("Blé").unwrap(), SOURCE);
    }

    #[tokio::test]
    async fn failures_are_counted_not_fatal() {
        let source = MemoryStore::with_pages(&[("Blé", "Le blé."), ("Orge", "L'orge.\n[[en:Barley]]")]);
        let target = MemoryStore::with_pages(&[]);
        let mut pipeline = pipeline(&source, &target, Failing, options(false, false));

        let summary = pipeline.process_pages(&["Blé", "", "# comment", "Orge"]).await;
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.to_string(), "Pages: 2 | Translated: 0 | Linked: 0 | Skipped: 1 | Errors: 1");
    }

    #[tokio::test]
    async fn chunks_are_reassembled_in_order() {
        let body: String = (0..40).map(|i| format!("== S{i} ==\nParagraphe {i} sur le blé.\n")).collect();
        let source = MemoryStore::with_pages(&[("Blé", &body)]);
        let target = MemoryStore::with_pages(&[]);
        let chunker = Chunker::try_new(wikitrans_chunker::ChunkerConfig::with_max_tokens(30)).unwrap();
        let pipeline = pipeline(&source, &target, Glossary, options(true, false)).with_chunker(chunker);

        let page = pipeline.translate_wikitext(&body, "Wheat").await.unwrap();
        assert!(page.chunks > 1);
        let positions: Vec<usize> = (0..40)
            .map(|i| page.text.find(&format!("== S{i} ==\nParagraphe {i} sur le wheat.")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
    fn audit_notes(path: &std::path::Path) -> Vec<String> {
        csv::Reader::from_path(path)
            .unwrap()
            .records()
            .map(|r| r.unwrap()[6].to_string())
            .collect()
    }

    #[tokio::test]
    async fn validator_issues_reach_the_audit_notes() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("audit.csv");
        let source = MemoryStore::with_pages(&[("Blé", "Le blé."), ("Orge", "L'orge.")]);
        let target = MemoryStore::with_pages(&[]);

        let reply = r#"{"preserved_templates": true, "preserved_links": false, "issues": ["link lost", "file renamed"]}"#;
        let mut reviewed = pipeline(&source, &target, Reviewer(reply), options(true, false))
            .with_audit(AuditLog::open(&log_path).unwrap());
        let PageOutcome::Translated(page) = reviewed.process_page("Blé").await.unwrap() else {
            panic!("expected a translation");
        };
        assert_eq!(page.validation.preserved_links, Some(false));

        let mut garbled = pipeline(&source, &target, Reviewer("not json"), options(true, false))
            .with_audit(AuditLog::open(&log_path).unwrap());
        garbled.process_page("Orge").await.unwrap();

        assert_eq!(
            audit_notes(&log_path),
            vec!["link lost;file renamed", "invalid JSON from validator"]
        );
    }

    #[test]
    fn structure_mismatch_precedes_validator_issues() {
        let page = TranslatedPage {
            target_title: "Wheat".into(),
            text: "{{A}".into(),
            chunks: 1,
            subpages: BTreeMap::new(),
            report: StructureReport::compare("{{A}}", "{{A}"),
            validation: ValidationReport {
                issues: vec!["brace lost".into()],
                ..ValidationReport::default()
            },
        };
        let notes = page.notes();
        assert!(notes.starts_with("Braces: 1/1 -> 1/0"), "{notes}");
        assert!(notes.ends_with(";brace lost"));
    }

    #[tokio::test]
    async fn stub_review_leaves_notes_empty() {
        let source = MemoryStore::with_pages(&[]);
        let target = MemoryStore::with_pages(&[]);
        let pipeline = pipeline(&source, &target, StubTranslator, options(true, false));
        let page = pipeline.translate_wikitext("Le blé.", "Blé").await.unwrap();
        assert_eq!(page.validation, ValidationReport::default());
        assert_eq!(page.notes(), "");
    }

    #[tokio::test]
    async fn prose_matching_a_plain_reference_is_translated() {
        let source = MemoryStore::with_pages(&[]);
        let target = MemoryStore::with_pages(&[]);
        let pipeline = pipeline(&source, &target, Shout("data"), options(true, false));

        let page = pipeline
            .translate_wikitext("{{Chart|json=data}} The data shows {{Databox}}", "Chart")
            .await
            .unwrap();
        assert!(page.subpages.is_empty());
        assert!(page.text.contains("The DATA shows {{Databox}}"), "{}", page.text);
        assert!(page.report.is_clean());
    }
}
