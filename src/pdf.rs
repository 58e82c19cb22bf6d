use lopdf::{
    content::{Content, Operation},
    Dictionary, Object, ObjectId, Stream, StringFormat,
};
use std::{
    collections::{BTreeMap, HashMap},
    io::BufWriter,
    mem,
};
use time::OffsetDateTime;

use crate::error::{ContextError, ErrorKind};
use crate::fonts::OverlayFont;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_PAGE_ATTRIBUTES: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// How deep the page tree of a template is walked when looking for inherited attributes.
const MAXIMUM_PAGE_TREE_DEPTH: usize = 32;

/// The media box given to a copied page when its template does not specify one (US Letter).
const DEFAULT_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// The prefix of the names the overlay fonts are registered under in the page resources.
const FONT_RESOURCE_PREFIX: &str = "InvoiceF";

/// The information written to the `Info` dictionary of the output document.
#[derive(Debug, Clone)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: Option<String>,
    pub creation_date: OffsetDateTime,
}

/// A page of the output document together with the overlay text still to be drawn on it.
#[derive(Debug, Clone)]
struct PdfPage {
    /// The page dictionary in the output document.
    object_id: ObjectId,
    /// Content operations drawing the overlay, attached to the page when the document is written.
    overlay: Vec<Operation>,
}

/// This struct represents the output PDF document on a high-level. It is an interface to the underlying
/// `lopdf::Document` into which pages are copied from other documents, with the fonts embedded
/// for the text drawn over those pages.
///
/// The pages are addressed by their index in the order they were copied in, text is drawn
/// with `write_text_to_page` and nothing is committed to the underlying document until
/// `write_all` assembles the page tree, the fonts and the overlays.
pub struct PdfDocument {
    /// The association between the font resource names, the object they will be stored at and the font itself.
    fonts: BTreeMap<String, (ObjectId, OverlayFont)>,
    /// The underlying PDF document: this is a low-level interface and shouldn't be directly interacted with
    /// unless strictly necessary.
    pub inner_document: lopdf::Document,
    /// The object the page tree root is stored at, reserved up front so copied pages can point at it.
    pages_id: ObjectId,
    pages: Vec<PdfPage>,
    written: bool,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    /// Create a new, empty `PdfDocument` following version 1.7 of the PDF specification.
    pub fn new() -> Self {
        let mut inner_document = lopdf::Document::with_version("1.7");
        let pages_id = inner_document.new_object_id();

        PdfDocument {
            fonts: BTreeMap::new(),
            inner_document,
            pages_id,
            pages: Vec::new(),
            written: false,
        }
    }

    /// The number of pages copied into the document so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Copy the pages at the given (zero-based) indices of `source` to the end of this document, returning
    /// the indices of the new pages. Objects shared by the copied pages, such as their resources, are
    /// copied once. Attributes the source pages inherit from their page tree are set on the copies.
    ///
    /// # Arguments
    ///
    /// * `source` - The document to copy the pages from, which is left untouched.
    /// * `page_indices` - The indices of the pages to copy, in the order they should be appended.
    pub fn copy_pages(
        &mut self,
        source: &lopdf::Document,
        page_indices: &[usize],
    ) -> Result<Vec<usize>, ContextError> {
        let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
        let mut copier = ObjectCopier::new(source);
        let mut copied_indices = Vec::with_capacity(page_indices.len());

        for &page_index in page_indices {
            let source_page_id = *source_pages.get(page_index).ok_or_else(|| {
                ContextError::composition(format!(
                    "Unable to copy the page with index {}, the document has {} pages",
                    page_index,
                    source_pages.len()
                ))
            })?;
            let source_page = source.get_dictionary(source_page_id).map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Composition,
                    format!("Unable to read the page with index {}", page_index),
                    &error,
                )
            })?;

            let mut page = Dictionary::new();
            for (key, value) in source_page.iter() {
                if key.as_slice() != b"Parent" {
                    page.set(key.clone(), copier.copy(&mut self.inner_document, value));
                }
            }
            for attribute in INHERITABLE_PAGE_ATTRIBUTES {
                if page.has(attribute.as_bytes()) {
                    continue;
                }
                if let Some(value) = inherited_attribute(source, source_page, attribute) {
                    page.set(attribute, copier.copy(&mut self.inner_document, value));
                }
            }
            if !page.has(b"MediaBox") {
                page.set(
                    "MediaBox",
                    DEFAULT_MEDIA_BOX.iter().map(|&value| Object::Integer(value)).collect::<Vec<_>>(),
                );
            }
            page.set("Parent", Object::Reference(self.pages_id));

            let object_id = self.inner_document.add_object(page);
            self.pages.push(PdfPage {
                object_id,
                overlay: Vec::new(),
            });
            copied_indices.push(self.pages.len() - 1);
            log::debug!("Copied the page with index {} as page {}", page_index, self.pages.len() - 1);
        }

        Ok(copied_indices)
    }

    /// Register a font to draw text with, returning the index to refer to it by. The font is embedded
    /// in this document when it is written, whatever the fonts of the copied pages are.
    pub fn add_font(&mut self, font: OverlayFont) -> usize {
        let font_index = self.fonts.len();
        let font_object_id = self.inner_document.new_object_id();
        self.fonts
            .insert(font_resource_name(font_index), (font_object_id, font));

        font_index
    }

    /// Retrieve the font at the given font index.
    pub fn font(&self, font_index: usize) -> Result<&OverlayFont, ContextError> {
        self.fonts
            .get(&font_resource_name(font_index))
            .map(|(_, font)| font)
            .ok_or_else(|| {
                ContextError::composition(format!("Failed to find font {} into the fonts map", font_index))
            })
    }

    /// Draws the text in the specified font, size and color at the given position of a page. The position is
    /// expressed in the user-space points of the page, the origin being the bottom-left corner.
    ///
    /// # Arguments
    ///
    /// * `page_index` - The index of the page to write the text to, as returned by `copy_pages`.
    /// * `color` - The RGB color employed for filling the text, each component between 0 and 1.
    /// * `text` - The text to be written.
    /// * `font_index` - The index of the font to be used, as returned by `add_font`.
    /// * `font_size` - The size of the font.
    /// * `position` - Where the baseline of the text begins.
    pub fn write_text_to_page(
        &mut self,
        page_index: usize,
        color: [f32; 3],
        text: &str,
        font_index: usize,
        font_size: f32,
        position: [f32; 2],
    ) -> Result<(), ContextError> {
        let resource_name = font_resource_name(font_index);
        let encoded_text = self.font(font_index)?.encode_text(text)?;
        let [x, y] = position;
        let [r, g, b] = color;

        let page = self.pages.get_mut(page_index).ok_or_else(|| {
            ContextError::composition(format!("Failed to find the page with index {}", page_index))
        })?;
        page.overlay.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(resource_name.into_bytes()), Object::Real(font_size)],
            ),
            Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new(
                "Tj",
                vec![Object::String(encoded_text, StringFormat::Hexadecimal)],
            ),
            Operation::new("ET", vec![]),
        ]);

        Ok(())
    }

    /// Assemble the document: embed the fonts, attach the overlays to their pages, build the page tree,
    /// the catalog and the document information. After this the document can only be optimized or saved.
    pub fn write_all(&mut self, metadata: &DocumentMetadata) -> Result<(), ContextError> {
        if self.written {
            return Err(ContextError::composition("The document has already been written"));
        }

        let mut font_resources = Dictionary::new();
        for (resource_name, (font_object_id, font)) in self.fonts.iter() {
            let font_dictionary = font.insert_into_document(&mut self.inner_document, resource_name);
            self.inner_document
                .objects
                .insert(*font_object_id, Object::Dictionary(font_dictionary));
            font_resources.set(resource_name.clone(), Object::Reference(*font_object_id));
        }

        for page in self.pages.iter_mut() {
            let overlay = mem::take(&mut page.overlay);
            if !overlay.is_empty() {
                attach_overlay(&mut self.inner_document, page.object_id, &font_resources, overlay)?;
            }
        }

        let page_ids: Vec<Object> = self.pages.iter().map(|page| Object::Reference(page.object_id)).collect();
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name("Pages".into())),
            ("Count", Object::Integer(self.pages.len() as i64)),
            ("Kids", Object::Array(page_ids)),
        ]);
        self.inner_document.objects.insert(self.pages_id, Object::Dictionary(pages));

        let timestamp = to_pdf_timestamp_format(&metadata.creation_date).into_bytes();
        let producer = format!("studio-invoice {}", env!("CARGO_PKG_VERSION"));
        let mut document_info = Dictionary::from_iter(vec![
            ("Title", Object::String(metadata.title.clone().into_bytes(), StringFormat::Literal)),
            ("Creator", Object::String(producer.clone().into_bytes(), StringFormat::Literal)),
            ("Producer", Object::String(producer.into_bytes(), StringFormat::Literal)),
            ("CreationDate", Object::String(timestamp.clone(), StringFormat::Literal)),
            ("ModDate", Object::String(timestamp, StringFormat::Literal)),
        ]);
        if let Some(author) = &metadata.author {
            document_info.set("Author", Object::String(author.clone().into_bytes(), StringFormat::Literal));
        }
        let document_info_id = self.inner_document.add_object(document_info);

        let catalog_id = self.inner_document.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name("Catalog".into())),
            ("PageLayout", Object::Name("OneColumn".into())),
            ("PageMode", Object::Name("UseNone".into())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.inner_document.trailer.set("Root", Object::Reference(catalog_id));
        self.inner_document.trailer.set("Info", Object::Reference(document_info_id));

        self.written = true;
        Ok(())
    }

    /// Optimize the PDF document (only superficially).
    pub fn optimize(&mut self) {
        self.inner_document.prune_objects();
        self.inner_document.renumber_objects();
        self.inner_document.compress();
    }

    /// Save the `PdfDocument` to bytes in order for it to be written to a file or further processed.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        if !self.written {
            return Err(ContextError::composition(
                "The document must be written before it is saved",
            ));
        }

        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Composition,
                "Error while saving the PDF document to bytes",
                &error,
            )
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }
}

fn font_resource_name(font_index: usize) -> String {
    format!("{FONT_RESOURCE_PREFIX}{font_index}")
}

/// Look an attribute up in the ancestors of a page.
fn inherited_attribute<'a>(
    source: &'a lopdf::Document,
    page: &'a Dictionary,
    attribute: &str,
) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAXIMUM_PAGE_TREE_DEPTH {
        let parent_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = source.get_dictionary(parent_id).ok()?;
        if let Ok(value) = node.get(attribute.as_bytes()) {
            return Some(value);
        }
    }
    None
}

/// Deep-copies objects of one document into another, following references. Every source object
/// is copied at most once, so pages copied with the same copier share their resources.
struct ObjectCopier<'a> {
    source: &'a lopdf::Document,
    copied_ids: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a lopdf::Document) -> Self {
        Self {
            source,
            copied_ids: HashMap::new(),
        }
    }

    fn copy(&mut self, target: &mut lopdf::Document, object: &Object) -> Object {
        match object {
            Object::Reference(source_id) => Object::Reference(self.copy_indirect(target, *source_id)),
            Object::Array(items) => Object::Array(items.iter().map(|item| self.copy(target, item)).collect()),
            Object::Dictionary(dictionary) => Object::Dictionary(self.copy_dictionary(target, dictionary)),
            Object::Stream(stream) => {
                let mut copied = stream.clone();
                copied.dict = self.copy_dictionary(target, &stream.dict);
                Object::Stream(copied)
            }
            other => other.clone(),
        }
    }

    fn copy_indirect(&mut self, target: &mut lopdf::Document, source_id: ObjectId) -> ObjectId {
        if let Some(target_id) = self.copied_ids.get(&source_id) {
            return *target_id;
        }

        // Registered before recursing so reference cycles terminate
        let target_id = target.new_object_id();
        self.copied_ids.insert(source_id, target_id);

        let source = self.source;
        let copied = match source.get_object(source_id) {
            Ok(object) => self.copy(target, object),
            Err(error) => {
                log::debug!("Dangling reference {:?} copied as null: {}", source_id, error);
                Object::Null
            }
        };
        target.objects.insert(target_id, copied);

        target_id
    }

    /// Copies a dictionary without the links back into the source page tree, which would
    /// otherwise drag every page of the source along.
    fn copy_dictionary(&mut self, target: &mut lopdf::Document, dictionary: &Dictionary) -> Dictionary {
        let is_annotation = matches!(dictionary.get(b"Type"), Ok(Object::Name(name)) if name == b"Annot");

        let mut copied = Dictionary::new();
        for (key, value) in dictionary.iter() {
            if key.as_slice() == b"Parent" || (is_annotation && key.as_slice() == b"P") {
                continue;
            }
            copied.set(key.clone(), self.copy(target, value));
        }
        copied
    }
}

/// Resolve an optional dictionary entry, which may be inline or indirect, into an owned dictionary.
fn owned_dictionary(
    document: &lopdf::Document,
    object: Option<&Object>,
    description: &str,
) -> Result<Dictionary, ContextError> {
    match object {
        None => Ok(Dictionary::new()),
        Some(Object::Dictionary(dictionary)) => Ok(dictionary.clone()),
        Some(Object::Reference(object_id)) => document.get_dictionary(*object_id).cloned().map_err(|error| {
            ContextError::with_error(
                ErrorKind::Composition,
                format!("Unable to resolve the {}", description),
                &error,
            )
        }),
        Some(_) => Err(ContextError::composition(format!(
            "The {} is not a dictionary",
            description
        ))),
    }
}

/// Attach the overlay operations to a page: the fonts are merged into a private copy of the page
/// resources, the existing contents are isolated in their own graphics state and the overlay
/// stream is drawn after them.
fn attach_overlay(
    document: &mut lopdf::Document,
    page_id: ObjectId,
    font_resources: &Dictionary,
    overlay: Vec<Operation>,
) -> Result<(), ContextError> {
    let page = document.get_dictionary(page_id).map_err(|error| {
        ContextError::with_error(
            ErrorKind::Composition,
            "Unable to find a copied page",
            &error,
        )
    })?;

    let mut resources = owned_dictionary(document, page.get(b"Resources").ok(), "page resources")?;
    let mut fonts = owned_dictionary(document, resources.get(b"Font").ok(), "page font resources")?;
    for (resource_name, font_reference) in font_resources.iter() {
        if fonts.has(resource_name) {
            return Err(ContextError::composition(format!(
                "The page already has a font named {}",
                std::string::String::from_utf8_lossy(resource_name)
            )));
        }
        fonts.set(resource_name.clone(), font_reference.clone());
    }
    resources.set("Font", Object::Dictionary(fonts));

    let mut contents = match page.get(b"Contents").ok() {
        None => Vec::new(),
        Some(Object::Reference(contents_id)) => match document.get_object(*contents_id) {
            Ok(Object::Array(streams)) => streams.clone(),
            _ => vec![Object::Reference(*contents_id)],
        },
        Some(Object::Array(streams)) => streams.clone(),
        Some(_) => {
            return Err(ContextError::composition(
                "The contents of a copied page are neither a stream nor an array of streams",
            ))
        }
    };

    let mut operations = Vec::with_capacity(overlay.len() + 2);
    operations.push(Operation::new("q", vec![]));
    operations.extend(overlay);
    operations.push(Operation::new("Q", vec![]));
    let overlay_bytes = Content { operations }.encode().map_err(|error| {
        ContextError::with_error(
            ErrorKind::Composition,
            "Failed to encode the overlay content",
            &error,
        )
    })?;

    if !contents.is_empty() {
        let save_id = document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let restore_id = document.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
        contents.insert(0, Object::Reference(save_id));
        contents.push(Object::Reference(restore_id));
    }
    let overlay_id = document.add_object(Stream::new(Dictionary::new(), overlay_bytes));
    contents.push(Object::Reference(overlay_id));

    let page = document
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|error| {
            ContextError::with_error(
                ErrorKind::Composition,
                "Unable to update a copied page",
                &error,
            )
        })?;
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Array(contents));

    Ok(())
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}
