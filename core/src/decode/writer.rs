use crate::ast::{AssignOp, BinOp, UnOp};
use crate::decode::opcodes::{A_DEFAULT, A_IGNORE, A_SUPER, A_THIS, CONSTANT_OFFSET, NodeTag, REGISTER_OFFSET};
use crate::pool::ConstId;

/// Encoder for method bodies, the mirror image of the decoder.
///
/// Used to build bodies in tests and by tools that synthesize code.
#[derive(Debug, Default, Clone)]
pub struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn byte(&mut self, b: u8) -> &mut Self {
        self.bytes.push(b);
        self
    }

    /// Writes `value` in the shortest packed form.
    pub fn packed(&mut self, value: i64) -> &mut Self {
        if (-64..=127).contains(&value) {
            self.bytes.push(value as u8);
        } else if (-4096..=4095).contains(&value) {
            self.bytes.push(0x80 | ((value >> 8) as u8 & 0x1F));
            self.bytes.push(value as u8);
        } else {
            let count = (2..=8)
                .find(|n| {
                    let bits = n * 8;
                    bits == 64 || (value >> (bits - 1)) == 0 || (value >> (bits - 1)) == -1
                })
                .unwrap_or(8);
            self.bytes.push(0xA0 | (count as u8 - 1));
            for i in (0..count).rev() {
                self.bytes.push((value >> (i * 8)) as u8);
            }
        }
        self
    }

    pub fn magnitude(&mut self, value: u32) -> &mut Self {
        self.packed(value as i64)
    }

    /// Tag in statement position.
    pub fn stmt(&mut self, tag: NodeTag) -> &mut Self {
        self.byte(tag as u8)
    }

    /// Tag in expression position.
    pub fn expr(&mut self, tag: NodeTag) -> &mut Self {
        if tag.is_short() {
            self.packed(tag as u8 as i64)
        } else {
            self.packed(NodeTag::Escape as u8 as i64).byte(tag as u8)
        }
    }

    /// Empty expression slot.
    pub fn none(&mut self) -> &mut Self {
        self.packed(0)
    }

    /// Constant in expression position.
    pub fn constant(&mut self, id: ConstId) -> &mut Self {
        self.packed(CONSTANT_OFFSET - id.0 as i64)
    }

    /// Constant-pool index in a field position.
    pub fn const_id(&mut self, id: ConstId) -> &mut Self {
        self.magnitude(id.0)
    }

    pub fn register(&mut self, reg: u32) -> &mut Self {
        self.packed(REGISTER_OFFSET + reg as i64)
    }

    pub fn this(&mut self) -> &mut Self {
        self.packed(A_THIS)
    }

    pub fn super_(&mut self) -> &mut Self {
        self.packed(A_SUPER)
    }

    pub fn default_arg(&mut self) -> &mut Self {
        self.packed(A_DEFAULT)
    }

    pub fn ignore(&mut self) -> &mut Self {
        self.packed(A_IGNORE)
    }

    pub fn bin_op(&mut self, op: BinOp) -> &mut Self {
        self.byte(op.to_byte().unwrap_or(u8::MAX))
    }

    pub fn un_op(&mut self, op: UnOp) -> &mut Self {
        self.byte(op.to_byte())
    }

    pub fn assign_op(&mut self, op: AssignOp) -> &mut Self {
        self.byte(op.to_byte())
    }
}
