//! NetCDF-backed lazy variables and dataset loading.
//!
//! [`NetcdfVariable`] reads windows of a NetCDF variable on demand,
//! re-opening the file on every call so concurrent chunk reads never share a
//! handle. [`open_dataset`] builds a [`Dataset`] of lazy variables with
//! metadata converted into the crate's attribute model.

use std::path::{Path, PathBuf};

use netcdf::{self, Attribute};
use tracing::{debug, info, warn};

use crate::array::ArrayLike;
use crate::chunks::Chunk;
use crate::config::ChunkConfig;
use crate::dataarray::DataArray;
use crate::dataset::{AttributeValue, Dataset};
use crate::dtype::{ArrayValue, Dtype};
use crate::error::{CoriolisError, Result};
use crate::selection::{resolve_key, Sel};

/// A lazy window reader over one NetCDF variable.
pub struct NetcdfVariable {
    path: PathBuf,
    name: String,
    shape: Vec<usize>,
    dtype: Dtype,
}

impl NetcdfVariable {
    /// Open `path` once to record the variable's shape and type; later reads
    /// re-open it.
    pub fn open(path: &Path, name: &str) -> Result<Self> {
        let file = netcdf::open(path)?;
        let var = file.variable(name).ok_or_else(|| CoriolisError::DataNotFound {
            message: format!("Variable not found: {}", name),
        })?;
        let dtype = dtype_of(&var).ok_or_else(|| CoriolisError::InvalidParameter {
            param: "variable".to_string(),
            message: format!("{} has an unsupported type: {:?}", name, var.vartype()),
        })?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        Ok(Self {
            path: path.to_path_buf(),
            name: name.to_string(),
            shape,
            dtype,
        })
    }
}

impl ArrayLike for NetcdfVariable {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn dtype(&self) -> Dtype {
        self.dtype
    }

    fn read(&self, key: &[Sel]) -> Result<ArrayValue> {
        let resolved = resolve_key(key, &self.shape)?;
        let bounds = resolved.bounding();
        let slab_shape: Vec<usize> = bounds.iter().map(|b| b.len()).collect();

        // the library cannot stride; read the dense bounding window and
        // apply the step in memory. Re-open per call: no shared cursor.
        let file = netcdf::open(&self.path)?;
        let var = file
            .variable(&self.name)
            .ok_or_else(|| CoriolisError::DataNotFound {
                message: format!("Variable not found: {}", self.name),
            })?;
        let extents: Vec<netcdf::Extent> = bounds
            .iter()
            .map(|b| netcdf::Extent::SliceCount {
                start: b.start,
                count: b.len(),
                stride: 1,
            })
            .collect();

        macro_rules! window {
            ($t:ty, $variant:ident) => {{
                let values: Vec<$t> = var.get_values::<$t, _>(extents.as_slice())?;
                ArrayValue::$variant(ndarray::ArrayD::from_shape_vec(
                    ndarray::IxDyn(&slab_shape),
                    values,
                )?)
            }};
        }
        let slab = match self.dtype {
            Dtype::U8 => window!(u8, U8),
            Dtype::I8 => window!(i8, I8),
            Dtype::U16 => window!(u16, U16),
            Dtype::I16 => window!(i16, I16),
            Dtype::U32 => window!(u32, U32),
            Dtype::I32 => window!(i32, I32),
            Dtype::U64 => window!(u64, U64),
            Dtype::I64 => window!(i64, I64),
            Dtype::F32 => window!(f32, F32),
            Dtype::F64 => window!(f64, F64),
        };
        let origins: Vec<usize> = bounds.iter().map(|b| b.start).collect();
        slab.gather(&resolved.rebase(&origins))
    }
}

/// Load a NetCDF file as a dataset of lazy variables.
///
/// The trailing two dimensions of each variable are chunked per `chunks`;
/// leading dimensions stay whole, ready for blockwise dispatch over the
/// spatial axes.
pub fn open_dataset(path: &Path, chunks: &ChunkConfig) -> Result<Dataset> {
    if !path.exists() {
        return Err(CoriolisError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }
    let file = netcdf::open(path)?;
    info!("Opened NetCDF file: {}", path.display());
    debug!("File has {} variables", file.variables().count());
    debug!("File has {} dimensions", file.dimensions().count());

    let mut ds = Dataset::new();
    for attr in file.attributes() {
        ds.attrs.insert(attr.name().to_string(), convert_attribute(&attr)?);
    }

    for var in file.variables() {
        let name = var.name().to_string();
        if dtype_of(&var).is_none() {
            warn!("Skipping unsupported variable: {}", name);
            continue;
        }
        let dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        if dims.is_empty() {
            warn!("Skipping scalar variable: {}", name);
            continue;
        }

        let spec: Vec<Chunk> = chunk_spec(dims.len(), chunks);
        let dim_refs: Vec<&str> = dims.iter().map(|d| d.as_str()).collect();
        let adapter = NetcdfVariable::open(path, &name)?;
        let mut array = DataArray::from_array(std::sync::Arc::new(adapter), &dim_refs, &spec)?;
        for attr in var.attributes() {
            array
                .attrs
                .insert(attr.name().to_string(), convert_attribute(&attr)?);
        }
        ds.insert(&name, array)?;
    }

    ds.validate()?;
    Ok(ds)
}

/// Chunk the trailing two dimensions; leading dimensions stay whole.
fn chunk_spec(ndim: usize, chunks: &ChunkConfig) -> Vec<Chunk> {
    let mut spec = vec![Chunk::Full; ndim];
    if ndim >= 2 {
        spec[ndim - 2] = Chunk::Size(chunks.rows);
        spec[ndim - 1] = Chunk::Size(chunks.columns);
    } else {
        spec[0] = Chunk::Size(chunks.columns);
    }
    spec
}

fn dtype_of(var: &netcdf::Variable) -> Option<Dtype> {
    use netcdf::types::{BasicType, VariableType};

    match var.vartype() {
        VariableType::Basic(BasicType::Byte) => Some(Dtype::I8),
        VariableType::Basic(BasicType::Ubyte) => Some(Dtype::U8),
        VariableType::Basic(BasicType::Short) => Some(Dtype::I16),
        VariableType::Basic(BasicType::Ushort) => Some(Dtype::U16),
        VariableType::Basic(BasicType::Int) => Some(Dtype::I32),
        VariableType::Basic(BasicType::Uint) => Some(Dtype::U32),
        VariableType::Basic(BasicType::Int64) => Some(Dtype::I64),
        VariableType::Basic(BasicType::Uint64) => Some(Dtype::U64),
        VariableType::Basic(BasicType::Float) => Some(Dtype::F32),
        VariableType::Basic(BasicType::Double) => Some(Dtype::F64),
        _ => None,
    }
}

/// Convert a NetCDF attribute to our AttributeValue enum
fn convert_attribute(attr: &Attribute) -> Result<AttributeValue> {
    use netcdf::AttributeValue as NcAttributeValue;

    let value = attr.value()?;

    match value {
        // String types
        NcAttributeValue::Str(s) => Ok(AttributeValue::Text(s)),

        // Numeric types - store as f64 for simplicity
        NcAttributeValue::Uchar(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Schar(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Ushort(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Short(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Int(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Uint(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Float(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Double(v) => Ok(AttributeValue::Number(v)),

        NcAttributeValue::Floats(v) => Ok(AttributeValue::NumberArray(
            v.into_iter().map(|x| x as f64).collect(),
        )),
        NcAttributeValue::Doubles(v) => Ok(AttributeValue::NumberArray(v)),
        NcAttributeValue::Ints(v) => Ok(AttributeValue::NumberArray(
            v.into_iter().map(|x| x as f64).collect(),
        )),

        // Convert any other types to a text representation
        _ => Ok(AttributeValue::Text(format!("{:?}", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Create a test NetCDF file with sample data
    fn create_test_file(path: &Path) -> Result<()> {
        let mut file = netcdf::create(path)?;

        file.add_dimension("columns", 6)?;
        file.add_dimension("rows", 4)?;
        file.add_dimension("bands", 2)?;

        let mut lon_var = file.add_variable::<f64>("longitude", &["rows", "columns"])?;
        lon_var.add_attribute("units", "degrees_east")?;
        let lon_data: Vec<f64> = (0..24).map(|i| i as f64 * 0.5).collect();
        lon_var.put_values(&lon_data, (0..4, 0..6))?;

        let mut rho_var = file.add_variable::<f32>("rho_toa", &["bands", "rows", "columns"])?;
        rho_var.add_attribute("units", "dimensionless")?;
        let rho_data: Vec<f32> = (0..48).map(|i| i as f32).collect();
        rho_var.put_values(&rho_data, (0..2, 0..4, 0..6))?;

        file.add_attribute("sensor", "OLCI")?;
        Ok(())
    }

    #[test]
    fn test_lazy_variable_window() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.nc");
        create_test_file(&path)?;

        let var = NetcdfVariable::open(&path, "rho_toa")?;
        assert_eq!(var.shape(), &[2, 4, 6]);
        assert_eq!(var.dtype(), Dtype::F32);

        let window = var.read(&[Sel::at(1), Sel::range(1, 3), Sel::range(0, 2)])?;
        let arr = window.as_f32().unwrap();
        assert_eq!(arr.shape(), &[2, 2]);
        // band 1 starts at 24; row 1 starts at 6 within the band
        assert_eq!(arr[[0, 0]], 30.0);
        assert_eq!(arr[[1, 1]], 37.0);
        Ok(())
    }

    #[test]
    fn test_open_dataset() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.nc");
        create_test_file(&path)?;

        let chunks = ChunkConfig {
            rows: 2,
            columns: 3,
        };
        let ds = open_dataset(&path, &chunks)?;

        assert!(ds.has_variable("rho_toa"));
        assert!(ds.has_variable("longitude"));
        assert_eq!(
            ds.attrs.get("sensor"),
            Some(&AttributeValue::Text("OLCI".to_string()))
        );

        let rho = ds.get_variable_checked("rho_toa")?;
        assert_eq!(rho.dims(), &["bands", "rows", "columns"]);
        // leading dims whole, trailing dims chunked
        assert_eq!(rho.chunks().nblocks(0), 1);
        assert_eq!(rho.chunks().nblocks(1), 2);
        assert_eq!(rho.chunks().nblocks(2), 2);

        let full = rho.compute()?;
        assert_eq!(full.as_f32().unwrap()[[1, 3, 5]], 47.0);
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let chunks = ChunkConfig {
            rows: 2,
            columns: 2,
        };
        assert!(open_dataset(Path::new("/nonexistent/file.nc"), &chunks).is_err());
    }

    #[test]
    fn test_missing_variable() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.nc");
        create_test_file(&path)?;
        assert!(NetcdfVariable::open(&path, "missing").is_err());
        Ok(())
    }
}
