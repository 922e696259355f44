use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::io::{self, Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, FromPrimitive)]
enum Tag {
	Leaf = 0,
	Children = 1,
}

impl Tag {
	fn write<W: Write>(self, writer: &mut W) -> io::Result<()> {
		writer.write_u16::<BigEndian>(self as u16)
	}

	fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
		let raw = reader.read_u16::<BigEndian>()?;

		Tag::from_u16(raw).ok_or_else(|| io::Error::new(
			io::ErrorKind::InvalidData,
			format!("unknown tree node type {:?}", raw),
		))
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
	pub value: f64,
	pub column: usize,
}

impl Split {
	pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
		let column = u16::try_from(self.column).map_err(|_| io::Error::new(
			io::ErrorKind::InvalidInput,
			format!("split column {} does not fit the artifact format", self.column),
		))?;

		writer.write_f64::<BigEndian>(self.value)?;
		writer.write_u16::<BigEndian>(column)?;

		Ok(())
	}

	pub fn deserialize<R: Read>(reader: &mut R) -> io::Result<Self> {
		let value = reader.read_f64::<BigEndian>()?;
		let column = reader.read_u16::<BigEndian>()? as usize;

		Ok(Self { value, column })
	}
}

/// One slot of a tree stored as a flat vector. Children always live at
/// higher indices than their parent, so walking down always terminates.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
	Leaf(f64),
	Children {
		left: usize,
		right: usize,
		split: Split,
	},
}

impl Node {
	pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
		match self {
			Node::Leaf(value) => {
				Tag::Leaf.write(writer)?;
				writer.write_f64::<BigEndian>(*value)?;
			},
			Node::Children { left, right, split } => {
				Tag::Children.write(writer)?;
				split.serialize(writer)?;
				writer.write_u32::<BigEndian>(*left as u32)?;
				writer.write_u32::<BigEndian>(*right as u32)?;
			}
		}

		Ok(())
	}

	pub fn deserialize<R: Read>(reader: &mut R) -> io::Result<Self> {
		match Tag::read(reader)? {
			Tag::Leaf => Ok(Node::Leaf(reader.read_f64::<BigEndian>()?)),
			Tag::Children => {
				let split = Split::deserialize(reader)?;
				let left = reader.read_u32::<BigEndian>()? as usize;
				let right = reader.read_u32::<BigEndian>()? as usize;

				Ok(Node::Children { split, left, right })
			},
		}
	}
}
