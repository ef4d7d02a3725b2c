pub use crate::data_structs::{
    Artifact,
    CellTable,
    ColumnarStore,
    Dataset,
    DatasetBuilder,
    Embedding,
    EmbeddingStore,
    FeatureTable,
    IndexView,
    Matrix,
    Payload,
    ScalarValue,
    CELL_ID,
    FEATURE_ID,
};
pub use crate::display::{
    DatasetSummary,
    DisplayMode,
    RenderContext,
};
pub use crate::error::TidyError;
pub use crate::io::{
    CsvBundleLoader,
    Loader,
};
pub use crate::tidy::{
    Joined,
    NestedTable,
    Shape,
    SortOrder,
    DATA,
};
pub use crate::tools::pseudobulk::aggregate_cells;
pub use crate::tools::render::DelimitedRenderer;
pub use crate::tools::{
    Renderer,
    Transform,
};
