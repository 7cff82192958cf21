use crate::ast::{BinOp, NodeId, NodeKind};
use crate::errors::Result;
use crate::pool::{Const, MethodInfo};
use crate::rewrite::Rewriter;
use crate::types::Type;

impl<'a, 't> Rewriter<'a, 't> {
    /// Type-level `equals`, `compare` and `hashCode`, dispatched on the
    /// owner type known at compile time.
    pub(crate) fn lower_funky(&mut self, id: NodeId, method: &MethodInfo<'t>) -> Result<Option<NodeId>> {
        let args: Vec<NodeId> = self.ast.kids(id).iter().skip(1).flatten().copied().collect();
        let owner = method.owner;
        let simple = owner.prim().is_some() || matches!(owner, Type::Str);

        let lowered = match (method.name.as_str(), args.as_slice()) {
            ("equals", [a, b]) if simple => {
                let op = if matches!(owner, Type::Str) {
                    BinOp::Equals
                } else {
                    BinOp::Eq
                };
                self.binary(op, *a, *b)
            }
            ("compare", [a, b]) if simple => self.binary(BinOp::Cmp, *a, *b),
            ("hashCode", [a]) if simple => {
                let int = self.types.int();
                match owner.prim() {
                    Some(p) => {
                        let wrapper = self.types.boxed(p);
                        let info = MethodInfo::new("hashCode", wrapper)
                            .static_()
                            .param("value", self.types.prim(p))
                            .returns(int);
                        self.invoke(info, None, &[*a])
                    }
                    None => {
                        let info = MethodInfo::new("hashCode", owner).returns(int);
                        self.invoke(info, Some(*a), &[])
                    }
                }
            }
            (name, _) => {
                // `Point.equals$Point(a, b)`
                let mut info = MethodInfo::new(&format!("{}${}", name, owner.raw_name()), owner).static_();
                for param in &method.params {
                    info = info.param(&param.name, param.ty);
                }
                info.rets = method.rets.clone();
                self.invoke(info, None, &args)
            }
        };
        Ok(Some(lowered))
    }

    pub(crate) fn invoke(&mut self, info: MethodInfo<'t>, target: Option<NodeId>, args: &[NodeId]) -> NodeId {
        let method = self.pool.add(Const::Method(Box::new(info)));
        let kids = core::iter::once(target).chain(args.iter().copied().map(Some));
        self.ast.add(NodeKind::Invoke { method }, kids)
    }
}
